//! One-shot lease commands.
//!
//! Each command opens its own manager with the shutdown sweep disabled, so
//! exiting never touches leases held by running servers.

use anyhow::Context;
use uuid::Uuid;
use vl_domain::config::Config;

use super::{close_manager, open_manager};

pub async fn status(config: &Config, subject: Uuid) -> anyhow::Result<bool> {
    let manager = open_manager(config, false).await?;
    let held = manager.is_held(subject).await;
    close_manager(manager).await?;

    let held = held.with_context(|| format!("checking lease for {subject}"))?;
    println!("{subject}: {}", if held { "held" } else { "free" });
    Ok(held)
}

pub async fn acquire(config: &Config, subject: Uuid) -> anyhow::Result<()> {
    let manager = open_manager(config, false).await?;
    let ttl = manager.ttl();
    let key = manager.keys().key_for(subject);
    let acquired = manager.acquire(subject).await;
    close_manager(manager).await?;

    acquired.with_context(|| format!("acquiring lease for {subject}"))?;
    println!("acquired {key} for {}s", ttl.as_secs());
    Ok(())
}

pub async fn release(config: &Config, subject: Uuid) -> anyhow::Result<()> {
    let manager = open_manager(config, false).await?;
    let key = manager.keys().key_for(subject);
    let released = manager.release(subject).await;
    close_manager(manager).await?;

    released.with_context(|| format!("releasing lease for {subject}"))?;
    println!("released {key}");
    Ok(())
}

/// Sweep the whole namespace.  Returns `false` if the sweep stopped early.
pub async fn sweep(config: &Config) -> anyhow::Result<bool> {
    let manager = open_manager(config, false).await?;
    let pattern = manager.keys().pattern();
    let sweeper = manager.clone();
    let report = tokio::task::spawn_blocking(move || sweeper.sweep_now())
        .await
        .context("sweep task")?;
    close_manager(manager).await?;

    println!(
        "swept {pattern}: {} lease(s) deleted in {} scan(s){}",
        report.deleted,
        report.iterations,
        if report.truncated {
            " (stopped at iteration cap)"
        } else if report.failed {
            " (stopped on store error)"
        } else {
            ""
        },
    );
    Ok(!report.truncated && !report.failed)
}
