mod executor;
mod lease;
mod observability;
mod session;
mod store;

pub use executor::*;
pub use lease::*;
pub use observability::*;
pub use session::*;
pub use store::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub lease: LeaseConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease.ttl_secs)
    }

    pub fn shutdown_drain(&self) -> Duration {
        Duration::from_millis(self.executor.shutdown_drain_ms)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.store.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.host".into(),
                message: "host must not be empty".into(),
            });
        }

        if self.store.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        // The prefix is a key segment; glob metacharacters would leak into
        // the sweep pattern and match other namespaces.
        if self.store.prefix.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.prefix".into(),
                message: "prefix must not be empty".into(),
            });
        } else if self
            .store
            .prefix
            .chars()
            .any(|c| matches!(c, '*' | '?' | '[' | ']' | '\\'))
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.prefix".into(),
                message: "prefix must not contain glob characters (* ? [ ] \\)".into(),
            });
        }

        if self.store.password.is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "store.password".into(),
                message: "no password configured".into(),
            });
        }

        // Sockets reject a zero timeout.
        for (field, value) in [
            ("store.connect_timeout_ms", self.store.connect_timeout_ms),
            ("store.io_timeout_ms", self.store.io_timeout_ms),
        ] {
            if value == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: field.into(),
                    message: "timeout must be greater than 0".into(),
                });
            }
        }

        if self.lease.ttl_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "lease.ttl_secs".into(),
                message: "ttl must be at least 1 second".into(),
            });
        }

        if self.lease.sweep_page_size == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "lease.sweep_page_size".into(),
                message: "page size must be greater than 0".into(),
            });
        }

        if self.lease.sweep_max_iterations == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "lease.sweep_max_iterations".into(),
                message: "iteration cap must be greater than 0".into(),
            });
        }

        if self.executor.workers == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "executor.workers".into(),
                message: "worker pool needs at least one worker".into(),
            });
        }

        if self.executor.shutdown_drain_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "executor.shutdown_drain_ms".into(),
                message: "pending releases are abandoned immediately at shutdown".into(),
            });
        }

        if self.session.entry_policy == EntryPolicy::FailOpen {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "session.entry_policy".into(),
                message: "fail_open admits players while the lease store is unreachable".into(),
            });
        }

        errors
    }
}
