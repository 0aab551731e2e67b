pub mod once;
pub mod run;
pub mod test_message;
pub mod today;

use std::sync::Arc;

use anyhow::{Context, Result};
use calnudge_core::config::NudgeConfig;
use calnudge_core::local_time::SystemClock;
use calnudge_core::scheduler::ReminderScheduler;
use calnudge_sqlite::SqliteStore;
use calnudge_telegram::TelegramMessenger;

pub async fn open_store(config: &NudgeConfig) -> Result<Arc<SqliteStore>> {
    let path = config.database_path();
    let store = SqliteStore::open(&path)
        .await
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(Arc::new(store))
}

pub fn messenger(config: &NudgeConfig) -> Result<Arc<TelegramMessenger>> {
    let messenger = TelegramMessenger::new(&config.telegram_api_base, config.send_timeout)
        .context("Failed to build Telegram client")?;
    Ok(Arc::new(messenger))
}

pub fn scheduler(config: &NudgeConfig, store: Arc<SqliteStore>) -> Result<ReminderScheduler> {
    Ok(ReminderScheduler::new(
        store,
        messenger(config)?,
        Arc::new(SystemClock),
        config.scheduler_config(),
    ))
}
