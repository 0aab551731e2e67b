use anyhow::{Context, Result};
use calnudge_core::config::NudgeConfig;
use calnudge_core::dispatch::Dispatcher;
use owo_colors::OwoColorize;

pub async fn run(config: &NudgeConfig, user_id: i64) -> Result<()> {
    let store = super::open_store(config).await?;
    let dispatcher =
        Dispatcher::new(store.clone(), super::messenger(config)?).with_send_timeout(config.send_timeout);

    let result = dispatcher
        .send_test_message(user_id)
        .await
        .with_context(|| format!("Test message to user {} failed", user_id));
    store.close().await;
    result?;

    println!("{} Test message sent to user {}", "✓".green(), user_id);
    Ok(())
}
