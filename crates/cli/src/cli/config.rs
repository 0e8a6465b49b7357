use vl_domain::config::{Config, ConfigSeverity};

/// One-line summary of the settings that decide lease behaviour.
pub fn lease_summary(config: &Config) -> String {
    format!(
        "{}:{}/{} prefix={:?} ttl={}s mode={:?} sweep={} (page {}, cap {}) workers={} drain={}ms entry={:?}",
        config.store.host,
        config.store.port,
        config.store.database,
        config.store.prefix,
        config.lease.ttl_secs,
        config.lease.acquire_mode,
        if config.lease.sweep_on_shutdown { "on" } else { "off" },
        config.lease.sweep_page_size,
        config.lease.sweep_max_iterations,
        config.executor.workers,
        config.executor.shutdown_drain_ms,
        config.session.entry_policy,
    )
}

/// Print the lease settings and any validation issues.
///
/// Returns `false` when at least one error was found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    println!("{config_path}: {}", lease_summary(config));

    let issues = config.validate();
    let (errors, warnings): (Vec<_>, Vec<_>) = issues
        .iter()
        .partition(|e| e.severity == ConfigSeverity::Error);

    for issue in errors.iter().chain(warnings.iter()) {
        println!("  {issue}");
    }

    if errors.is_empty() {
        println!("OK ({} warning(s))", warnings.len());
        true
    } else {
        println!("{} error(s), {} warning(s)", errors.len(), warnings.len());
        false
    }
}

/// Dump the resolved config (with all defaults filled in) as TOML.
///
/// The store password is masked.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let mut shown = config.clone();
    if shown.store.password.is_some() {
        shown.store.password = Some("********".into());
    }
    print!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}
