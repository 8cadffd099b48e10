use std::sync::Arc;

use rcb_core::config::Config;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), rcb_core::Error> {
    rcb_core::logging::init("rcb")?;

    let cfg = match Config::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!("{e}");
            return Err(e);
        }
    };
    tracing::debug!(config = ?cfg, "configuration loaded");

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    rcb_telegram::runner::run_polling(cfg, shutdown)
        .await
        .map_err(|e| rcb_core::Error::External(format!("telegram bot failed: {e:#}")))?;

    Ok(())
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM (systemd stop).
async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("cannot install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutdown requested");
    shutdown.cancel();
}
