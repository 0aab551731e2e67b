use anyhow::{Context, Result};
use calnudge_core::config::NudgeConfig;
use calnudge_core::local_time::today_local;
use calnudge_core::recurrence::events_on;
use calnudge_core::store::ReminderStore;
use calnudge_core::{Event, Recurrence};
use chrono::NaiveDate;
use owo_colors::OwoColorize;

pub async fn run(config: &NudgeConfig, date: Option<&str>) -> Result<()> {
    let date = match date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))?,
        None => today_local(),
    };

    let store = super::open_store(config).await?;
    let events = store.list_events().await;
    store.close().await;
    let events = events?;

    println!("{}", date.format("%a %b %-d, %Y").bold());

    let todays = events_on(&events, date);
    if todays.is_empty() {
        println!("  {}", "No events".dimmed());
        return Ok(());
    }

    for event in todays {
        println!("  {}", render_event(event));
    }
    Ok(())
}

/// e.g. `  14:30 Design review @ Room 4 (weekly)`
fn render_event(event: &Event) -> String {
    let time = if event.all_day {
        "all-day".to_string()
    } else {
        format!("{:>7}", event.start.naive().format("%H:%M").to_string())
    };

    let mut line = format!("{} {}", time, event.title);
    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        line.push_str(&format!(" {}", format!("@ {}", location).dimmed()));
    }
    if event.recurrence != Recurrence::None {
        line.push_str(&format!(" {}", format!("({})", event.recurrence).dimmed()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use calnudge_core::local_time::LocalDateTime;

    fn event(all_day: bool, recurrence: Recurrence, location: Option<&str>) -> Event {
        Event {
            id: 1,
            owner_id: 1,
            calendar_id: None,
            title: "Design review".into(),
            description: None,
            location: location.map(String::from),
            start: LocalDateTime::from_ymd_hms(2025, 3, 20, 9, 5, 0).unwrap(),
            end: LocalDateTime::from_ymd_hms(2025, 3, 20, 10, 0, 0).unwrap(),
            all_day,
            recurrence,
            self_notify: false,
        }
    }

    #[test]
    fn timed_event_shows_padded_time() {
        let line = render_event(&event(false, Recurrence::None, None));
        assert_eq!(line, "  09:05 Design review");
    }

    #[test]
    fn all_day_recurring_event_is_annotated() {
        let line = render_event(&event(true, Recurrence::Weekly, Some("Room 4")));
        assert!(line.starts_with("all-day Design review"));
        assert!(line.contains("Room 4"));
        assert!(line.contains("(weekly)"));
    }
}
