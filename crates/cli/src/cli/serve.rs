use anyhow::Context;
use vl_domain::config::Config;

use super::{close_manager, open_manager};

/// Hold a lease manager until SIGINT/SIGTERM, then shut it down (stopping
/// the pool, sweeping this namespace and closing the store).
pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<()> {
    let manager = open_manager(config, true)
        .await
        .context("starting vaultlock")?;

    tracing::info!(
        config = %config_path,
        prefix = %manager.keys().prefix(),
        workers = manager.pool().size(),
        ttl_secs = manager.ttl().as_secs(),
        mode = ?config.lease.acquire_mode,
        "vaultlock serving",
    );

    shutdown_signal().await;

    let report = close_manager(manager).await?;
    tracing::info!(
        deleted = report.deleted,
        iterations = report.iterations,
        truncated = report.truncated,
        "vaultlock stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler, waiting for SIGINT only");
                let _ = ctrl_c.await;
                tracing::info!("received SIGINT, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        tracing::info!("received SIGINT, shutting down");
    }
}
