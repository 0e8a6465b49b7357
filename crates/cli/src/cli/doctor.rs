use vl_domain::config::{Config, ConfigSeverity, EntryPolicy};

use super::config::lease_summary;

/// Result of one diagnostic.
struct Check {
    name: &'static str,
    passed: bool,
    detail: String,
    /// Extra lines printed under the result.
    notes: Vec<String>,
}

impl Check {
    fn new(name: &'static str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed,
            detail: detail.into(),
            notes: Vec::new(),
        }
    }

    fn print(&self) {
        let status = if self.passed { "PASS" } else { "FAIL" };
        println!("  [{status}] {}: {}", self.name, self.detail);
        for note in &self.notes {
            println!("      {note}");
        }
    }
}

/// Run all diagnostic checks and print a summary.
///
/// Returns `Ok(true)` when every check passes.  A missing config file is
/// reported but does not fail the run, since defaults are usable.
pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("vaultlock doctor");
    println!("  {}\n", lease_summary(config));

    let checks = vec![
        config_file(config_path),
        validation(config),
        store_reachable(config).await,
        entry_policy(config),
    ];

    for check in &checks {
        check.print();
    }

    let failed = checks.iter().filter(|c| !c.passed).count();
    println!();
    if failed == 0 {
        println!("All checks passed.");
    } else {
        println!("{failed} check(s) failed.");
    }
    Ok(failed == 0)
}

fn config_file(config_path: &str) -> Check {
    if std::path::Path::new(config_path).exists() {
        Check::new("Config file", true, config_path)
    } else {
        Check::new("Config file", true, format!("{config_path} not found, using defaults"))
    }
}

fn validation(config: &Config) -> Check {
    let issues = config.validate();
    let errors = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let mut check = Check::new(
        "Config validation",
        errors == 0,
        format!("{errors} error(s), {} warning(s)", issues.len() - errors),
    );
    check.notes = issues.iter().map(ToString::to_string).collect();
    check
}

async fn store_reachable(config: &Config) -> Check {
    let store_cfg = config.store.clone();
    let endpoint = format!("{}:{}/{}", store_cfg.host, store_cfg.port, store_cfg.database);

    let result = tokio::task::spawn_blocking(move || {
        let store = vl_store::connect(&store_cfg)?;
        let pinged = store.ping();
        store.close();
        pinged
    })
    .await;

    match result {
        Ok(Ok(())) => Check::new("Lease store", true, format!("{endpoint} answered PING")),
        Ok(Err(e)) => Check::new("Lease store", false, format!("{endpoint}: {e}")),
        Err(e) => Check::new("Lease store", false, format!("{endpoint}: check aborted: {e}")),
    }
}

fn entry_policy(config: &Config) -> Check {
    let detail = match config.session.entry_policy {
        EntryPolicy::FailClosed => "fail_closed, players are refused while the store is down",
        EntryPolicy::FailOpen => "fail_open, players are let in while the store is down",
    };
    Check::new("Entry policy", true, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_is_not_a_failure() {
        let check = config_file("/nonexistent/vaultlock.toml");
        assert!(check.passed);
        assert!(check.detail.contains("using defaults"));
    }

    #[test]
    fn validation_lists_every_issue() {
        let mut config = Config::default();
        config.store.port = 0;
        let check = validation(&config);
        assert!(!check.passed);
        assert!(check.notes.iter().any(|n| n.contains("store.port")));
        assert!(check.notes.iter().any(|n| n.contains("store.password")));
    }

    #[tokio::test]
    async fn unreachable_store_fails() {
        let mut config = Config::default();
        config.store.port = 1;
        config.store.connect_timeout_ms = 200;
        assert!(!store_reachable(&config).await.passed);
    }
}
