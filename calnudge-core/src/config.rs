//! calnudge configuration at ~/.config/calnudge/config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Deserializer};

use crate::constants::{
    DEFAULT_DATABASE_PATH, DEFAULT_POLL_INTERVAL, DEFAULT_SEND_TIMEOUT, DEFAULT_TELEGRAM_API_BASE,
};
use crate::error::{NudgeError, NudgeResult};
use crate::scheduler::SchedulerConfig;

fn default_database() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_send_timeout() -> Duration {
    DEFAULT_SEND_TIMEOUT
}

fn default_telegram_api_base() -> String {
    DEFAULT_TELEGRAM_API_BASE.to_string()
}

/// Durations are written in humantime form, e.g. `"90s"` or `"1m"`.
fn deserialize_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let duration = humantime::parse_duration(&raw).map_err(serde::de::Error::custom)?;
    if duration.is_zero() {
        return Err(serde::de::Error::custom("duration must be greater than zero"));
    }
    Ok(duration)
}

/// Settings for the daemon, overridable with `CALNUDGE_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct NudgeConfig {
    #[serde(default = "default_database")]
    pub database: PathBuf,

    #[serde(default = "default_poll_interval", deserialize_with = "deserialize_duration")]
    pub poll_interval: Duration,

    #[serde(default = "default_send_timeout", deserialize_with = "deserialize_duration")]
    pub send_timeout: Duration,

    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        NudgeConfig {
            database: default_database(),
            poll_interval: default_poll_interval(),
            send_timeout: default_send_timeout(),
            telegram_api_base: default_telegram_api_base(),
        }
    }
}

impl NudgeConfig {
    pub fn config_path() -> NudgeResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| NudgeError::Config("Could not determine config directory".into()))?
            .join("calnudge");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, creating a commented template first if needed.
    pub fn load() -> NudgeResult<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            Self::create_default_config(&path)?;
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> NudgeResult<Self> {
        Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("CALNUDGE"))
            .build()
            .map_err(|e| NudgeError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| NudgeError::Config(format!("{}: {}", path.display(), e)))
    }

    /// The database path with `~` expanded.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database.to_string_lossy()).into_owned())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: self.poll_interval,
            send_timeout: self.send_timeout,
        }
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> NudgeResult<()> {
        let contents = format!(
            "\
# calnudge configuration

# SQLite database holding events and reminders:
# database = \"{}\"

# How often to scan for due reminders:
# poll_interval = \"{}\"

# Give up on a single message delivery after:
# send_timeout = \"{}\"

# Telegram Bot API endpoint:
# telegram_api_base = \"{}\"
",
            DEFAULT_DATABASE_PATH,
            humantime::format_duration(DEFAULT_POLL_INTERVAL),
            humantime::format_duration(DEFAULT_SEND_TIMEOUT),
            DEFAULT_TELEGRAM_API_BASE,
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NudgeError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| NudgeError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
