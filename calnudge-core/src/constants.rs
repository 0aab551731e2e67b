use std::time::Duration;

use chrono_tz::Tz;

/// The one timezone every stored wall-clock value is expressed in.
pub const DISPLAY_TIMEZONE: Tz = chrono_tz::Asia::Tokyo;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

pub const DEFAULT_DATABASE_PATH: &str = "~/.local/share/calnudge/calnudge.db";
