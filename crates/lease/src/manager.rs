//! Lease lock manager.
//!
//! One `LeaseManager` is built at startup and shared by `Arc`.  Acquire,
//! release and is-held all run on its worker pool; shutdown stops the pool,
//! sweeps this namespace on the calling thread, then closes the store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;
use vl_domain::config::{AcquireMode, Config};
use vl_domain::error::{Error, Result};
use vl_domain::trace::TraceEvent;
use vl_store::LeaseStore;

use crate::keys::LeaseKeys;
use crate::pool::{PoolFuture, WorkerPool};
use crate::sweep::{self, SweepOptions, SweepReport};

/// Stored under every lease key.  Only its presence matters.
const LEASE_MARKER: &str = "true";

pub struct LeaseManager {
    store: Arc<dyn LeaseStore>,
    pool: WorkerPool,
    keys: LeaseKeys,
    ttl: Duration,
    mode: AcquireMode,
    sweep_on_shutdown: bool,
    sweep_opts: SweepOptions,
    drain: Duration,
    stopped: AtomicBool,
}

impl LeaseManager {
    /// Start the worker pool and bind to `store` under `config.store.prefix`.
    pub fn new(store: Arc<dyn LeaseStore>, config: &Config) -> Result<Self> {
        if config.lease.ttl_secs == 0 {
            return Err(Error::Config("lease.ttl_secs must be at least 1".into()));
        }
        let pool = WorkerPool::new(&config.executor)?;

        Ok(Self {
            store,
            pool,
            keys: LeaseKeys::new(config.store.prefix.clone()),
            ttl: config.lease_ttl(),
            mode: config.lease.acquire_mode,
            sweep_on_shutdown: config.lease.sweep_on_shutdown,
            sweep_opts: SweepOptions::from(&config.lease),
            drain: config.shutdown_drain(),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn keys(&self) -> &LeaseKeys {
        &self.keys
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Take the lease on `subject` for one TTL.
    ///
    /// In `overwrite` mode this always replaces any existing lease.  In
    /// `exclusive` mode it resolves to [`Error::LeaseHeld`] if a live lease
    /// already exists.
    pub fn acquire(&self, subject: Uuid) -> PoolFuture<()> {
        tracing::info!(subject = %subject, mode = ?self.mode, "acquiring lease");

        let store = self.store.clone();
        let key = self.keys.key_for(subject);
        let ttl = self.ttl;
        let mode = self.mode;

        self.pool.submit("acquire", move || {
            match mode {
                AcquireMode::Overwrite => store.set_ex(&key, LEASE_MARKER, ttl)?,
                AcquireMode::Exclusive => {
                    if !store.set_nx_ex(&key, LEASE_MARKER, ttl)? {
                        return Err(Error::LeaseHeld { key });
                    }
                }
            }
            TraceEvent::LeaseAcquired {
                subject: subject.to_string(),
                key,
                exclusive: mode == AcquireMode::Exclusive,
                ttl_secs: ttl.as_secs(),
            }
            .emit();
            Ok(())
        })
    }

    /// Drop the lease on `subject`.  Releasing a lease that is not there
    /// succeeds.
    pub fn release(&self, subject: Uuid) -> PoolFuture<()> {
        tracing::info!(subject = %subject, "releasing lease");

        let store = self.store.clone();
        let key = self.keys.key_for(subject);
        self.pool
            .submit("release", move || delete_lease(store.as_ref(), subject, key).map(|_| ()))
    }

    /// Release on the calling thread, bypassing the pool.
    ///
    /// For final releases issued after the pool has stopped.  Returns
    /// whether a lease existed.
    pub fn release_now(&self, subject: Uuid) -> Result<bool> {
        tracing::info!(subject = %subject, "releasing lease synchronously");
        delete_lease(self.store.as_ref(), subject, self.keys.key_for(subject))
    }

    /// Whether a live lease exists for `subject`.
    ///
    /// A lease that was never taken and one that expired both read as
    /// `false`.  Store failures resolve to an error, never to `false`.
    pub fn is_held(&self, subject: Uuid) -> PoolFuture<bool> {
        tracing::debug!(subject = %subject, "checking lease");

        let store = self.store.clone();
        let key = self.keys.key_for(subject);
        self.pool.submit("is_held", move || {
            let held = store.get(&key)?.is_some();
            tracing::debug!(subject = %subject, held, "lease check result");
            TraceEvent::LeaseChecked {
                subject: subject.to_string(),
                held,
            }
            .emit();
            Ok(held)
        })
    }

    /// Run the namespace sweep now, on the calling thread.
    pub fn sweep_now(&self) -> SweepReport {
        sweep::sweep(self.store.as_ref(), &self.keys.pattern(), self.sweep_opts)
    }

    /// Stop the pool, sweep (if enabled) and close the store.
    ///
    /// Blocks the caller.  Safe to call more than once; later calls do
    /// nothing and return an empty report.
    pub fn shutdown(&self) -> SweepReport {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return SweepReport::default();
        }
        tracing::info!(prefix = %self.keys.prefix(), "shutting down lease manager");

        self.pool.shutdown(self.drain);

        let report = if self.sweep_on_shutdown {
            self.sweep_now()
        } else {
            SweepReport::default()
        };

        if self.store.is_open() {
            self.store.close();
        }
        tracing::info!(
            deleted = report.deleted,
            iterations = report.iterations,
            "lease manager shut down"
        );
        report
    }

    pub fn is_shut_down(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

fn delete_lease(store: &dyn LeaseStore, subject: Uuid, key: String) -> Result<bool> {
    let existed = store.del(std::slice::from_ref(&key))? > 0;
    TraceEvent::LeaseReleased {
        subject: subject.to_string(),
        key,
        existed,
    }
    .emit();
    Ok(existed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vl_store::MemoryStore;

    fn manager(prefix: &str) -> (LeaseManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut config = Config::default();
        config.store.prefix = prefix.into();
        config.executor.workers = 2;
        (LeaseManager::new(store.clone(), &config).unwrap(), store)
    }

    #[test]
    fn acquire_writes_marker_with_ttl() {
        let (mgr, store) = manager("ax");
        let subject = Uuid::new_v4();
        mgr.acquire(subject).wait().unwrap();

        let key = format!("ax:{subject}:lock");
        assert_eq!(store.get(&key).unwrap().as_deref(), Some("true"));
        let ttl = store.ttl(&key).unwrap();
        assert!(ttl <= Duration::from_secs(60) && ttl > Duration::from_secs(55));
    }

    #[test]
    fn release_now_reports_existence() {
        let (mgr, _store) = manager("ax");
        let subject = Uuid::new_v4();
        assert!(!mgr.release_now(subject).unwrap());
        mgr.acquire(subject).wait().unwrap();
        assert!(mgr.release_now(subject).unwrap());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut config = Config::default();
        config.lease.ttl_secs = 0;
        let err = LeaseManager::new(Arc::new(MemoryStore::new()), &config)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn shutdown_twice_is_harmless() {
        let (mgr, store) = manager("ax");
        mgr.acquire(Uuid::new_v4()).wait().unwrap();
        assert_eq!(mgr.shutdown().deleted, 1);
        assert!(!store.is_open());
        assert_eq!(mgr.shutdown(), SweepReport::default());
    }
}
