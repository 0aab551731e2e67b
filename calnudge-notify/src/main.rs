mod commands;
mod singleton;

use std::path::PathBuf;

use anyhow::Result;
use calnudge_core::config::NudgeConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "calnudge")]
#[command(about = "Send Telegram reminders for upcoming calendar events")]
struct Cli {
    /// Read configuration from this file instead of ~/.config/calnudge/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reminder daemon until interrupted
    Run,
    /// Run a single scan-and-send cycle
    Once,
    /// List the events occurring on a day
    Today {
        /// Day to show (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Send a test message through a user's bot
    TestMessage {
        /// User id to send to
        #[arg(long)]
        user: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "calnudge=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => NudgeConfig::load_from(&path)?,
        None => NudgeConfig::load()?,
    };

    match cli.command {
        Commands::Run => commands::run::run(&config).await,
        Commands::Once => commands::once::run(&config).await,
        Commands::Today { date } => commands::today::run(&config, date.as_deref()).await,
        Commands::TestMessage { user } => commands::test_message::run(&config, user).await,
    }
}
