use anyhow::Result;
use calnudge_core::config::NudgeConfig;
use tracing::info;

use crate::singleton;

pub async fn run(config: &NudgeConfig) -> Result<()> {
    let _lock = singleton::acquire_lock()?;

    let store = super::open_store(config).await?;
    let scheduler = super::scheduler(config, store.clone())?;

    scheduler.start();
    shutdown_signal().await;

    info!("Shutting down, waiting for the current cycle to finish");
    scheduler.stop().await;
    store.close().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
