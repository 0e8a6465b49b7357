use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lease store connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_6379")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: i64,
    /// Namespace prefix for every lease key.  Processes sharing a store
    /// must agree on it, otherwise their leases never see each other.
    #[serde(default = "d_prefix")]
    pub prefix: String,
    #[serde(default = "d_2000")]
    pub connect_timeout_ms: u64,
    #[serde(default = "d_2000")]
    pub io_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: 6379,
            user: None,
            password: None,
            database: 0,
            prefix: d_prefix(),
            connect_timeout_ms: 2000,
            io_timeout_ms: 2000,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_6379() -> u16 {
    6379
}
fn d_prefix() -> String {
    "vaultlock".into()
}
fn d_2000() -> u64 {
    2000
}
