//! Shutdown-time removal of every lease under a namespace.
//!
//! Runs on the caller's thread.  Scans `{prefix}:*:lock` page by page and
//! deletes each page with a single `DEL`.  The iteration cap bounds the
//! time spent even if the store keeps handing back cursors.  Failures are
//! logged and end the sweep early; they never propagate, since leases left
//! behind still expire on their own.

use vl_domain::config::LeaseConfig;
use vl_domain::error::Result;
use vl_domain::trace::TraceEvent;
use vl_store::{LeaseStore, INITIAL_CURSOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOptions {
    /// `COUNT` hint passed to each scan.
    pub page_size: usize,
    pub max_iterations: u32,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_iterations: 1000,
        }
    }
}

impl From<&LeaseConfig> for SweepOptions {
    fn from(cfg: &LeaseConfig) -> Self {
        Self {
            page_size: cfg.sweep_page_size,
            max_iterations: cfg.sweep_max_iterations,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: u64,
    /// Scan calls that returned.
    pub iterations: u32,
    /// Stopped at the iteration cap before the scan completed.
    pub truncated: bool,
    /// Stopped early on a store error.
    pub failed: bool,
}

/// Delete every key matching `pattern`.
pub fn sweep(store: &dyn LeaseStore, pattern: &str, opts: SweepOptions) -> SweepReport {
    let mut report = SweepReport::default();

    if let Err(e) = run(store, pattern, opts, &mut report) {
        report.failed = true;
        tracing::error!(
            pattern,
            error = %e,
            deleted = report.deleted,
            iterations = report.iterations,
            "error while cleaning up leases"
        );
    }

    tracing::info!(
        pattern,
        deleted = report.deleted,
        iterations = report.iterations,
        "lease sweep finished"
    );
    TraceEvent::SweepCompleted {
        pattern: pattern.to_owned(),
        deleted: report.deleted,
        iterations: report.iterations,
        truncated: report.truncated,
    }
    .emit();

    report
}

fn run(
    store: &dyn LeaseStore,
    pattern: &str,
    opts: SweepOptions,
    report: &mut SweepReport,
) -> Result<()> {
    let mut cursor = INITIAL_CURSOR;

    loop {
        let page = store.scan(cursor, pattern, opts.page_size)?;
        report.iterations += 1;

        if !page.keys.is_empty() {
            let deleted = store.del(&page.keys)?;
            report.deleted += deleted;
            tracing::debug!(
                deleted,
                iteration = report.iterations,
                "deleted lease keys"
            );
        }

        // Some stores only signal the end through the cursor value.
        if page.finished || page.cursor == INITIAL_CURSOR {
            return Ok(());
        }

        if report.iterations >= opts.max_iterations {
            report.truncated = true;
            tracing::warn!(
                max_iterations = opts.max_iterations,
                "reached sweep iteration cap, stopping scan"
            );
            return Ok(());
        }

        cursor = page.cursor;
    }
}
