//! Key-value store clients for vaultlock.
//!
//! Provides the [`LeaseStore`] trait over the handful of Redis commands the
//! lease manager needs, a production implementation ([`RedisStore`]) that
//! speaks to any Redis-compatible server over one synchronous connection,
//! and an in-process implementation ([`MemoryStore`]) with real TTL and
//! cursor semantics for tests and local runs.
//!
//! All calls block the calling thread.  Callers that must not block hand
//! them to the worker pool in `vl-lease`.

pub mod memory;
pub mod redis;
pub mod store;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;
pub use store::{LeaseStore, ScanPage, INITIAL_CURSOR};

use std::sync::Arc;

use vl_domain::config::StoreConfig;
use vl_domain::error::Result;

/// Open a connection to the configured Redis-compatible store.
pub fn connect(cfg: &StoreConfig) -> Result<Arc<dyn LeaseStore>> {
    let store = RedisStore::connect(cfg)?;
    tracing::info!(
        endpoint = %store.endpoint(),
        prefix = %cfg.prefix,
        "connected to lease store"
    );
    Ok(Arc::new(store))
}
