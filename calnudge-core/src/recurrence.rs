//! Date matching for the four fixed recurrence classes.
//!
//! Dates passed here are already calendar dates in the display timezone; no
//! timezone work happens in this module.

use chrono::{Datelike, NaiveDate};

use crate::model::{Event, Recurrence};

/// Does an event anchored on `anchor` with `recurrence` occur on `candidate`?
pub fn occurs_on(anchor: NaiveDate, recurrence: Recurrence, candidate: NaiveDate) -> bool {
    if candidate < anchor {
        return false;
    }
    if candidate == anchor {
        return true;
    }

    match recurrence {
        Recurrence::None => false,
        Recurrence::Daily => true,
        Recurrence::Weekly => candidate.weekday() == anchor.weekday(),
        // Day 31 simply has no match in shorter months.
        Recurrence::Monthly => candidate.day() == anchor.day(),
        Recurrence::Yearly => candidate.day() == anchor.day() && candidate.month() == anchor.month(),
    }
}

impl Event {
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        occurs_on(self.start.date(), self.recurrence, date)
    }
}

/// Events occurring on `date`, all-day events first, then by start time of day.
pub fn events_on(events: &[Event], date: NaiveDate) -> Vec<&Event> {
    let mut matching: Vec<&Event> = events.iter().filter(|e| e.occurs_on(date)).collect();
    matching.sort_by_key(|e| (!e.all_day, e.start.naive().time(), e.id));
    matching
}
