use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lease behaviour
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseConfig {
    /// Lifetime of a lease in seconds.  Set at creation, never refreshed.
    #[serde(default = "d_60")]
    pub ttl_secs: u64,
    #[serde(default)]
    pub acquire_mode: AcquireMode,
    /// Delete every lease under the prefix when the manager shuts down.
    #[serde(default = "d_true")]
    pub sweep_on_shutdown: bool,
    #[serde(default = "d_100")]
    pub sweep_page_size: usize,
    #[serde(default = "d_1000")]
    pub sweep_max_iterations: u32,
}

/// How `acquire` treats a lease that already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquireMode {
    /// `SETEX`: last writer wins.
    #[default]
    Overwrite,
    /// `SET NX EX`: fail if a live lease exists.
    Exclusive,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            acquire_mode: AcquireMode::Overwrite,
            sweep_on_shutdown: true,
            sweep_page_size: 100,
            sweep_max_iterations: 1000,
        }
    }
}

fn d_60() -> u64 {
    60
}
fn d_true() -> bool {
    true
}
fn d_100() -> usize {
    100
}
fn d_1000() -> u32 {
    1000
}
