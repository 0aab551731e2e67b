//! Local wall-clock time in the fixed display timezone.
//!
//! Every timestamp calnudge stores or compares is a naive wall-clock value in
//! [`DISPLAY_TIMEZONE`]. Real instants (the system clock) are converted into
//! this representation exactly once, in [`LocalDateTime::from_instant`], and
//! never converted back.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DISPLAY_TIMEZONE;

const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";
const STORAGE_MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A naive date-time understood to be in [`DISPLAY_TIMEZONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalDateTime(NaiveDateTime);

/// Calendar and clock fields of a [`LocalDateTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl LocalDateTime {
    pub fn from_ymd_hms(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)?
            .and_hms_opt(hour, min, sec)
            .map(LocalDateTime)
    }

    /// Convert a real instant into display-timezone wall-clock time.
    pub fn from_instant<Z: TimeZone>(instant: DateTime<Z>) -> Self {
        LocalDateTime(instant.with_timezone(&DISPLAY_TIMEZONE).naive_local())
    }

    pub fn now() -> Self {
        Self::from_instant(Utc::now())
    }

    /// Parse `YYYY-MM-DD HH:MM[:SS]` or `YYYY-MM-DDTHH:MM[:SS]`.
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        let s = s.trim();
        NaiveDateTime::parse_from_str(s, STORAGE_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(s, ISO_FORMAT))
            .or_else(|_| NaiveDateTime::parse_from_str(s, MINUTE_FORMAT))
            .or_else(|_| NaiveDateTime::parse_from_str(s, STORAGE_MINUTE_FORMAT))
            .map(LocalDateTime)
    }

    /// The text form used by the storage layer.
    pub fn to_storage_string(&self) -> String {
        self.0.format(STORAGE_FORMAT).to_string()
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    pub fn parts(&self) -> LocalParts {
        LocalParts {
            year: self.0.year(),
            month: self.0.month(),
            day: self.0.day(),
            hour: self.0.hour(),
            minute: self.0.minute(),
        }
    }

    /// Wall-clock subtraction; saturates at the minimum representable time.
    pub fn minus_minutes(&self, minutes: i64) -> Self {
        Duration::try_minutes(minutes)
            .and_then(|d| self.0.checked_sub_signed(d))
            .map(LocalDateTime)
            .unwrap_or(LocalDateTime(NaiveDateTime::MIN))
    }
}

impl fmt::Display for LocalDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_storage_string())
    }
}

impl From<NaiveDateTime> for LocalDateTime {
    fn from(naive: NaiveDateTime) -> Self {
        LocalDateTime(naive)
    }
}

pub fn to_local_parts(timestamp: LocalDateTime) -> LocalParts {
    timestamp.parts()
}

/// Current wall-clock time in the display timezone.
pub fn now_local() -> LocalDateTime {
    LocalDateTime::now()
}

pub fn today_local() -> NaiveDate {
    now_local().date()
}

/// Source of "now" for the scheduler and agenda.
pub trait Clock: Send + Sync {
    fn now(&self) -> LocalDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// The real system clock, viewed through [`DISPLAY_TIMEZONE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> LocalDateTime {
        now_local()
    }
}

/// A manually driven clock.
#[derive(Debug)]
pub struct FixedClock(Mutex<LocalDateTime>);

impl FixedClock {
    pub fn new(at: LocalDateTime) -> Self {
        FixedClock(Mutex::new(at))
    }

    pub fn set(&self, at: LocalDateTime) {
        let mut guard = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> LocalDateTime {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
