//! Events, reminders and the people they notify.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::local_time::LocalDateTime;

pub type UserId = i64;
pub type EventId = i64;
pub type ReminderId = i64;
pub type FriendId = i64;
pub type CalendarId = i64;

/// Which calendar dates an event occurs on besides its anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
            Recurrence::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Recurrence::None),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            "yearly" => Ok(Recurrence::Yearly),
            other => Err(format!("Unknown recurrence class '{}'", other)),
        }
    }
}

/// A calendar event. Start and end are wall-clock times in the display timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub owner_id: UserId,
    pub calendar_id: Option<CalendarId>,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: LocalDateTime,
    pub end: LocalDateTime,
    pub all_day: bool,
    pub recurrence: Recurrence,
    /// Mention the owner in their own reminder
    pub self_notify: bool,
}

/// One scheduled notification for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub event_id: EventId,
    /// Lead time in minutes before the event starts
    pub minutes_before: i64,
    /// Set once, never cleared
    pub notified: bool,
    pub notified_at: Option<LocalDateTime>,
    pub custom_message: Option<String>,
}

impl Reminder {
    pub fn new(id: ReminderId, event_id: EventId, minutes_before: i64) -> Self {
        Reminder {
            id,
            event_id,
            minutes_before,
            notified: false,
            notified_at: None,
            custom_message: None,
        }
    }

    /// When this reminder becomes due for `event`.
    pub fn notify_time(&self, event: &Event) -> LocalDateTime {
        event.start.minus_minutes(self.minutes_before)
    }
}

/// A person tagged on events, reached through the event owner's bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friend {
    pub id: FriendId,
    pub owner_id: UserId,
    pub name: String,
    pub chat_id: Option<String>,
    pub username: Option<String>,
    pub color: String,
}

impl Friend {
    /// The chat to deliver to, if configured.
    pub fn deliverable_chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}

/// An account holder; owns events, friends and the bot that delivers reminders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub username: Option<String>,
}

/// A not-yet-notified reminder joined with its event.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReminder {
    pub reminder: Reminder,
    pub event: Event,
}

impl PendingReminder {
    pub fn notify_time(&self) -> LocalDateTime {
        self.reminder.notify_time(&self.event)
    }
}
