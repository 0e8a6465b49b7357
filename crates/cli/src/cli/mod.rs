pub mod config;
pub mod doctor;
pub mod lease;
pub mod serve;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;
use vl_domain::config::{Config, ConfigSeverity};
use vl_lease::LeaseManager;

/// Per-player vault leases over a shared Redis store.
#[derive(Debug, Parser)]
#[command(name = "vaultlock", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Hold a lease manager open until SIGINT/SIGTERM, then run the
    /// shutdown sweep (default when no subcommand is given).
    Serve,
    /// Report whether a player currently holds a lease.
    Status {
        /// Player UUID.
        subject: Uuid,
    },
    /// Take the lease on a player for one TTL.
    Acquire {
        /// Player UUID.
        subject: Uuid,
    },
    /// Drop the lease on a player.
    Release {
        /// Player UUID.
        subject: Uuid,
    },
    /// Delete every lease under the configured prefix.
    Sweep,
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `VAULTLOCK_CONFIG`
/// (or `vaultlock.toml` by default).  Returns the parsed [`Config`] and
/// the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path =
        std::env::var("VAULTLOCK_CONFIG").unwrap_or_else(|_| "vaultlock.toml".into());
    let config = load_config_from(Path::new(&config_path))?;
    Ok((config, config_path))
}

/// Parse `path`, falling back to defaults when the file does not exist.
pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

// ── Manager construction ──────────────────────────────────────────────

/// Refuse a config with error-level issues, naming every offending field.
pub fn ensure_valid(config: &Config) -> anyhow::Result<()> {
    let errors: Vec<String> = config
        .validate()
        .into_iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .map(|e| e.to_string())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("invalid configuration:\n  {}", errors.join("\n  "))
    }
}

/// Connect to the store and start a lease manager.
///
/// One-shot commands pass `sweep_on_shutdown = false` so that closing the
/// manager does not wipe leases owned by running servers.
pub async fn open_manager(
    config: &Config,
    sweep_on_shutdown: bool,
) -> anyhow::Result<Arc<LeaseManager>> {
    ensure_valid(config)?;
    let mut config = config.clone();
    config.lease.sweep_on_shutdown = sweep_on_shutdown && config.lease.sweep_on_shutdown;

    tokio::task::spawn_blocking(move || {
        let store = vl_store::connect(&config.store).with_context(|| {
            format!(
                "connecting to lease store at {}:{}",
                config.store.host, config.store.port
            )
        })?;
        let manager = LeaseManager::new(store, &config).context("starting lease manager")?;
        Ok(Arc::new(manager))
    })
    .await
    .context("store connect task")?
}

/// Run [`LeaseManager::shutdown`] off the async runtime.
pub async fn close_manager(manager: Arc<LeaseManager>) -> anyhow::Result<vl_lease::SweepReport> {
    tokio::task::spawn_blocking(move || manager.shutdown())
        .await
        .context("lease manager shutdown task")
}
