//! Row types and their conversion into core types.

use calnudge_core::error::{StoreError, StoreResult};
use calnudge_core::local_time::LocalDateTime;
use calnudge_core::{Event, Friend, PendingReminder, Recurrence, Reminder, User};
use sqlx::FromRow;

fn parse_time(column: &str, value: &str) -> StoreResult<LocalDateTime> {
    LocalDateTime::parse(value)
        .map_err(|e| StoreError::InvalidData(format!("{column} '{value}': {e}")))
}

fn parse_recurrence(value: &str) -> StoreResult<Recurrence> {
    value.parse().map_err(StoreError::InvalidData)
}

#[derive(Debug, FromRow)]
pub(crate) struct EventRow {
    pub id: i64,
    pub owner_id: i64,
    pub calendar_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub all_day: bool,
    pub recurrence: String,
    pub self_notify: bool,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> StoreResult<Self> {
        Ok(Event {
            id: row.id,
            owner_id: row.owner_id,
            calendar_id: row.calendar_id,
            title: row.title,
            description: row.description,
            location: row.location,
            start: parse_time("start_time", &row.start_time)?,
            end: parse_time("end_time", &row.end_time)?,
            all_day: row.all_day,
            recurrence: parse_recurrence(&row.recurrence)?,
            self_notify: row.self_notify,
        })
    }
}

/// A reminder joined with its event, as selected by the pending query.
#[derive(Debug, FromRow)]
pub(crate) struct PendingRow {
    pub reminder_id: i64,
    pub minutes_before: i64,
    pub notified: bool,
    pub notified_at: Option<String>,
    pub custom_message: Option<String>,
    #[sqlx(flatten)]
    pub event: EventRow,
}

impl TryFrom<PendingRow> for PendingReminder {
    type Error = StoreError;

    fn try_from(row: PendingRow) -> StoreResult<Self> {
        let notified_at = row
            .notified_at
            .as_deref()
            .map(|at| parse_time("notified_at", at))
            .transpose()?;

        Ok(PendingReminder {
            reminder: Reminder {
                id: row.reminder_id,
                event_id: row.event.id,
                minutes_before: row.minutes_before,
                notified: row.notified,
                notified_at,
                custom_message: row.custom_message,
            },
            event: row.event.try_into()?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct FriendRow {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub chat_id: Option<String>,
    pub username: Option<String>,
    pub color: String,
}

impl From<FriendRow> for Friend {
    fn from(row: FriendRow) -> Self {
        Friend {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            chat_id: row.chat_id,
            username: row.username,
            color: row.color,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub name: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub username: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            bot_token: row.bot_token,
            chat_id: row.chat_id,
            username: row.username,
        }
    }
}
