use anyhow::Result;
use calnudge_core::config::NudgeConfig;
use owo_colors::OwoColorize;

pub async fn run(config: &NudgeConfig) -> Result<()> {
    let store = super::open_store(config).await?;
    let scheduler = super::scheduler(config, store.clone())?;

    let summary = scheduler.run_once().await;
    store.close().await;

    if summary.processed == 0 {
        println!("{}", "No reminders due".dimmed());
        return Ok(());
    }

    let failed = summary.processed - summary.sent;
    println!(
        "Processed {} {}: {} sent{}",
        summary.processed,
        if summary.processed == 1 { "reminder" } else { "reminders" },
        summary.sent.to_string().green(),
        if failed > 0 {
            format!(", {} undelivered", failed.to_string().red())
        } else {
            String::new()
        }
    );
    Ok(())
}
