//! Distributed lease locks over a shared key-value store.
//!
//! Several server processes share one Redis-compatible store.  Before a
//! process loads a player's vault it checks for and takes a lease on that
//! player; when the player leaves it saves, unloads, and drops the lease.
//! Leases expire on their own after a fixed TTL, so a crashed process never
//! locks a player out permanently.
//!
//! * [`WorkerPool`] runs blocking store calls off the caller's thread.
//! * [`LeaseManager`] owns the key scheme and the acquire / release /
//!   is-held operations, and orchestrates shutdown.
//! * [`sweep`] deletes every lease under the namespace at shutdown.
//! * [`SessionBridge`] turns session start/end into lease calls under an
//!   explicit [`EntryPolicy`](vl_domain::config::EntryPolicy).
//!
//! Leases are advisory: nothing in the store stops a process that skips
//! the check.

pub mod bridge;
pub mod keys;
pub mod manager;
pub mod pool;
pub mod sweep;

pub use bridge::{Admission, DenyReason, SessionBridge, VaultRegistry};
pub use keys::LeaseKeys;
pub use manager::LeaseManager;
pub use pool::{PoolFuture, ShutdownReport, WorkerPool};
pub use sweep::{SweepOptions, SweepReport};
