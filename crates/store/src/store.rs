//! The `LeaseStore` trait defines the store surface the lease manager uses.

use std::time::Duration;

use vl_domain::error::Result;

/// Cursor value that starts a scan and, when returned, ends it.
pub const INITIAL_CURSOR: u64 = 0;

/// One page of a cursor scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor to pass to the next `scan` call.
    pub cursor: u64,
    pub keys: Vec<String>,
    /// Set when the store itself reports the iteration complete.
    pub finished: bool,
}

/// Synchronous client over a Redis-compatible key-value store.
///
/// Implementations must be safe to call from several worker threads at
/// once.  Only per-command atomicity is expected.
pub trait LeaseStore: Send + Sync {
    /// `SETEX key ttl value`.
    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// `SET key value NX EX ttl`.  Returns `false` when the key already exists.
    fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// `GET key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// `DEL key [key ...]`.  Returns the number of keys removed.
    fn del(&self, keys: &[String]) -> Result<u64>;

    /// `SCAN cursor MATCH pattern COUNT count`.
    fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage>;

    /// `PING`.
    fn ping(&self) -> Result<()>;

    /// Drop the underlying connection.  Later calls fail.
    fn close(&self);

    fn is_open(&self) -> bool;
}

/// Whole seconds for `EX`/`SETEX`; Redis rejects a zero expiry.
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsecond_ttl_rounds_up_to_one() {
        assert_eq!(ttl_secs(Duration::from_millis(200)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(60)), 60);
    }
}
