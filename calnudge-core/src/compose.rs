//! Notification text.
//!
//! Output is Telegram's HTML subset, so every user-supplied field goes
//! through [`escape_html`].

use chrono::{Datelike, Weekday};

use crate::model::{Event, Reminder, User};

const HEADER: &str = "🔔 <b>リマインダー</b>";
const LOCATION_MARKER: &str = "📍";
const CUSTOM_MESSAGE_MARKER: &str = "💬";

/// Display labels for the lead times offered when creating a reminder.
const LEAD_TIME_LABELS: &[(i64, &str)] = &[
    (5, "5分後"),
    (15, "15分後"),
    (30, "30分後"),
    (60, "1時間後"),
    (1440, "1日後"),
];

pub fn lead_time_label(minutes_before: i64) -> String {
    LEAD_TIME_LABELS
        .iter()
        .find(|(minutes, _)| *minutes == minutes_before)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| format!("{}分後", minutes_before))
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn weekday_ja(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "月",
        Weekday::Tue => "火",
        Weekday::Wed => "水",
        Weekday::Thu => "木",
        Weekday::Fri => "金",
        Weekday::Sat => "土",
        Weekday::Sun => "日",
    }
}

/// e.g. `2025/03/20(木) 14:30 - 15:30`, or `2025/03/20(木) 終日`.
pub fn format_event_time(event: &Event) -> String {
    let start = event.start.naive();
    let date = format!("{}({})", start.format("%Y/%m/%d"), weekday_ja(start.weekday()));

    if event.all_day {
        return format!("{} 終日", date);
    }

    let end = event.end.naive();
    if end > start && end.date() == start.date() {
        format!("{} {} - {}", date, start.format("%H:%M"), end.format("%H:%M"))
    } else {
        format!("{} {}", date, start.format("%H:%M"))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Build the reminder text shared by every recipient.
pub fn compose(event: &Event, reminder: &Reminder) -> String {
    let mut lines = vec![
        HEADER.to_string(),
        String::new(),
        format!("📅 <b>{}</b>", escape_html(&event.title)),
        format!("🕐 {}", format_event_time(event)),
    ];

    if let Some(location) = non_blank(&event.location) {
        lines.push(format!("{} {}", LOCATION_MARKER, escape_html(location)));
    }

    lines.push(format!("⏰ {}に開始します", lead_time_label(reminder.minutes_before)));

    if let Some(message) = non_blank(&reminder.custom_message) {
        lines.push(String::new());
        lines.push(format!("{} {}", CUSTOM_MESSAGE_MARKER, escape_html(message)));
    }

    lines.join("\n")
}

/// The handle to mention in the owner's copy, if the event asks for it.
pub fn owner_mention<'a>(event: &Event, owner: &'a User) -> Option<&'a str> {
    if !event.self_notify {
        return None;
    }
    owner.username.as_deref()
}

/// Prefix `base` with an @-mention. Handles may be stored with or without `@`.
pub fn with_mention(base: &str, handle: Option<&str>) -> String {
    let handle = handle.map(|h| h.trim().trim_start_matches('@')).unwrap_or("");
    if handle.is_empty() {
        return base.to_string();
    }
    format!("@{}\n{}", escape_html(handle), base)
}

/// The diagnostic text sent by the manual delivery test.
pub fn test_message(user: &User) -> String {
    format!(
        "✅ <b>calnudge</b>\n{}さん、通知の設定は正常です。",
        escape_html(&user.name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_time::LocalDateTime;
    use crate::model::Recurrence;

    fn event() -> Event {
        Event {
            id: 1,
            owner_id: 1,
            calendar_id: None,
            title: "Design review".into(),
            description: None,
            location: Some("Room 4".into()),
            start: LocalDateTime::from_ymd_hms(2025, 3, 20, 14, 30, 0).unwrap(),
            end: LocalDateTime::from_ymd_hms(2025, 3, 20, 15, 30, 0).unwrap(),
            all_day: false,
            recurrence: Recurrence::None,
            self_notify: true,
        }
    }

    fn owner(username: Option<&str>) -> User {
        User {
            id: 1,
            name: "Mika".into(),
            bot_token: Some("token".into()),
            chat_id: Some("100".into()),
            username: username.map(String::from),
        }
    }

    #[test]
    fn known_and_unknown_lead_time_labels() {
        assert_eq!(lead_time_label(60), "1時間後");
        assert_eq!(lead_time_label(1440), "1日後");
        assert_eq!(lead_time_label(45), "45分後");
    }

    #[test]
    fn message_contains_title_time_location_and_label() {
        let text = compose(&event(), &Reminder::new(1, 1, 15));
        assert!(text.starts_with(HEADER));
        assert!(text.contains("<b>Design review</b>"));
        assert!(text.contains("2025/03/20(木) 14:30 - 15:30"));
        assert!(text.contains("📍 Room 4"));
        assert!(text.contains("15分後に開始します"));
    }

    #[test]
    fn custom_message_is_appended() {
        let mut reminder = Reminder::new(1, 1, 15);
        reminder.custom_message = Some("bring slides".into());
        let text = compose(&event(), &reminder);
        assert!(text.contains("bring slides"));
        assert!(text.ends_with("💬 bring slides"));
    }

    #[test]
    fn no_custom_message_means_no_marker() {
        let text = compose(&event(), &Reminder::new(1, 1, 15));
        assert!(!text.contains(CUSTOM_MESSAGE_MARKER));

        let mut blank = Reminder::new(1, 1, 15);
        blank.custom_message = Some("   ".into());
        assert!(!compose(&event(), &blank).contains(CUSTOM_MESSAGE_MARKER));
    }

    #[test]
    fn missing_location_omits_line() {
        let mut event = event();
        event.location = None;
        let text = compose(&event, &Reminder::new(1, 1, 15));
        assert!(!text.contains(LOCATION_MARKER));
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn all_day_event_shows_date_only() {
        let mut event = event();
        event.all_day = true;
        assert_eq!(format_event_time(&event), "2025/03/20(木) 終日");
    }

    #[test]
    fn user_fields_are_escaped() {
        let mut event = event();
        event.title = "Q&A <live>".into();
        let text = compose(&event, &Reminder::new(1, 1, 5));
        assert!(text.contains("<b>Q&amp;A &lt;live&gt;</b>"));
    }

    #[test]
    fn mention_normalizes_sigil() {
        assert_eq!(with_mention("hi", Some("mika")), "@mika\nhi");
        assert_eq!(with_mention("hi", Some("@mika")), "@mika\nhi");
        assert_eq!(with_mention("hi", Some("  ")), "hi");
        assert_eq!(with_mention("hi", None), "hi");
    }

    #[test]
    fn owner_mention_requires_self_notify() {
        let owner = owner(Some("@mika"));
        let mut event = event();
        assert_eq!(owner_mention(&event, &owner), Some("@mika"));
        event.self_notify = false;
        assert_eq!(owner_mention(&event, &owner), None);
    }
}
