use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store worker pool
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "d_10")]
    pub workers: usize,
    /// Worker threads are named `{prefix}-{n}`.
    #[serde(default = "d_thread_prefix")]
    pub thread_name_prefix: String,
    /// How long shutdown waits for queued and in-flight store calls before
    /// abandoning them.  `0` halts immediately.
    #[serde(default = "d_250")]
    pub shutdown_drain_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            thread_name_prefix: d_thread_prefix(),
            shutdown_drain_ms: 250,
        }
    }
}

fn d_10() -> usize {
    10
}
fn d_thread_prefix() -> String {
    "vaultlock-store-worker".into()
}
fn d_250() -> u64 {
    250
}
