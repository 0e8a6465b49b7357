//! Session start/end → lease calls.
//!
//! On session start the bridge checks for a live lease and, if there is
//! none, takes one, blocking the caller until both store calls resolve.
//! What happens when the check itself fails is decided by [`EntryPolicy`].
//!
//! On session end it saves and unloads the subject's vaults through the
//! [`VaultRegistry`], then issues the release without waiting for it.

use std::sync::Arc;

use uuid::Uuid;
use vl_domain::config::EntryPolicy;
use vl_domain::error::{Error, Result};

use crate::manager::LeaseManager;

/// The in-memory vault holder the bridge saves and evicts on session end.
pub trait VaultRegistry: Send + Sync {
    /// Persist and drop every loaded vault of `subject`.
    fn save_and_unload(&self, subject: Uuid) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Granted,
    Denied(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Another process holds the lease.
    Locked,
    /// The store could not answer and the policy is fail-closed.
    LockCheckFailed,
}

pub struct SessionBridge<R> {
    manager: Arc<LeaseManager>,
    registry: R,
    policy: EntryPolicy,
}

impl<R: VaultRegistry> SessionBridge<R> {
    pub fn new(manager: Arc<LeaseManager>, registry: R, policy: EntryPolicy) -> Self {
        Self {
            manager,
            registry,
            policy,
        }
    }

    pub fn policy(&self) -> EntryPolicy {
        self.policy
    }

    /// Decide whether `subject` may start a session, taking the lease if so.
    ///
    /// Blocks the calling thread; do not call from async code.
    pub fn admit(&self, subject: Uuid) -> Admission {
        match self.manager.is_held(subject).wait() {
            Ok(true) => {
                tracing::info!(subject = %subject, "entry denied: lease held elsewhere");
                return Admission::Denied(DenyReason::Locked);
            }
            Ok(false) => {}
            Err(e) => {
                if let Some(denied) = self.on_store_failure(subject, "lease check", &e) {
                    return denied;
                }
            }
        }

        match self.manager.acquire(subject).wait() {
            Ok(()) => Admission::Granted,
            Err(Error::LeaseHeld { .. }) => {
                tracing::info!(subject = %subject, "entry denied: lease taken concurrently");
                Admission::Denied(DenyReason::Locked)
            }
            Err(e) => self
                .on_store_failure(subject, "lease acquire", &e)
                .unwrap_or(Admission::Granted),
        }
    }

    /// Save, unload and release `subject`.
    ///
    /// The release is fire-and-forget: this returns once it is queued.  If
    /// the worker pool has already stopped, the release runs on the calling
    /// thread instead.  A registry failure is logged and the lease is
    /// released anyway.
    pub fn end(&self, subject: Uuid) {
        tracing::info!(subject = %subject, "unloading subject");
        if let Err(e) = self.registry.save_and_unload(subject) {
            tracing::error!(subject = %subject, error = %e, "saving vaults on session end failed");
        }

        if self.manager.pool().is_shut_down() {
            tracing::warn!(
                subject = %subject,
                error = %Error::PoolShutdown,
                "releasing lease on the calling thread"
            );
            if let Err(e) = self.manager.release_now(subject) {
                tracing::error!(subject = %subject, error = %e, "releasing lease on session end failed");
            }
            return;
        }
        // A failed release is logged by the worker that runs it.
        drop(self.manager.release(subject));
    }

    fn on_store_failure(&self, subject: Uuid, step: &str, e: &Error) -> Option<Admission> {
        match self.policy {
            EntryPolicy::FailClosed => {
                tracing::warn!(subject = %subject, step, error = %e, "entry denied: lease store failed");
                Some(Admission::Denied(DenyReason::LockCheckFailed))
            }
            EntryPolicy::FailOpen => {
                tracing::warn!(subject = %subject, step, error = %e, "entry allowed despite lease store failure");
                None
            }
        }
    }
}
