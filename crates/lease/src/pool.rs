//! Bounded worker pool for blocking store calls.
//!
//! A fixed set of named OS threads pull jobs from a shared queue.  Each
//! submitted operation gets a [`PoolFuture`] that resolves to its result.
//! A failing or panicking operation resolves its own future to an error and
//! leaves the worker running.
//!
//! Shutdown stops intake, waits up to a drain window for queued and running
//! jobs, then halts: jobs still queued are dropped (their futures resolve
//! to [`Error::Cancelled`]) and workers still busy are detached.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tokio::sync::oneshot;
use vl_domain::config::ExecutorConfig;
use vl_domain::error::{Error, Result};
use vl_domain::trace::TraceEvent;

type Job = Box<dyn FnOnce() + Send + 'static>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Result handle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Result of one pooled operation.
///
/// Await it from async code or call [`wait`](Self::wait) from a plain
/// thread.  Dropping it does not cancel the operation.
pub struct PoolFuture<T> {
    state: State<T>,
}

enum State<T> {
    Ready(Option<Result<T>>),
    Pending(oneshot::Receiver<Result<T>>),
}

// No field is ever pinned in place.
impl<T> Unpin for PoolFuture<T> {}

impl<T> PoolFuture<T> {
    fn ready(result: Result<T>) -> Self {
        Self {
            state: State::Ready(Some(result)),
        }
    }

    fn pending(rx: oneshot::Receiver<Result<T>>) -> Self {
        Self {
            state: State::Pending(rx),
        }
    }

    /// Block the current thread until the operation finishes.
    ///
    /// Panics if called from inside an async runtime; `.await` there.
    pub fn wait(self) -> Result<T> {
        match self.state {
            State::Ready(result) => result.unwrap_or(Err(Error::Cancelled)),
            State::Pending(rx) => rx.blocking_recv().unwrap_or(Err(Error::Cancelled)),
        }
    }
}

impl<T> Future for PoolFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            State::Ready(result) => Poll::Ready(result.take().unwrap_or(Err(Error::Cancelled))),
            State::Pending(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(Error::Cancelled))),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pool
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Outcome of [`WorkerPool::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Every queued and running job finished inside the drain window.
    pub drained: bool,
    /// Jobs that never started.
    pub dropped: usize,
    /// Jobs still running when the pool gave up on them.
    pub abandoned: usize,
}

struct Shared {
    queued: AtomicUsize,
    in_flight: AtomicUsize,
    /// Jobs a worker took off the queue after halt and never ran.
    discarded: AtomicUsize,
    halted: AtomicBool,
    idle_lock: Mutex<()>,
    idle: Condvar,
}

impl Shared {
    fn is_idle(&self) -> bool {
        self.queued.load(Ordering::Acquire) == 0 && self.in_flight.load(Ordering::Acquire) == 0
    }

    fn notify_idle(&self) {
        let _guard = self.idle_lock.lock();
        self.idle.notify_all();
    }
}

pub struct WorkerPool {
    sender: Mutex<Option<Sender<Job>>>,
    receiver: Receiver<Job>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shared: Arc<Shared>,
    name: String,
    size: usize,
}

impl WorkerPool {
    /// Spawn `cfg.workers` threads named `{cfg.thread_name_prefix}-{n}`.
    pub fn new(cfg: &ExecutorConfig) -> Result<Self> {
        if cfg.workers == 0 {
            return Err(Error::Config("executor.workers must be at least 1".into()));
        }

        let (sender, receiver) = channel::unbounded::<Job>();
        let shared = Arc::new(Shared {
            queued: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
            halted: AtomicBool::new(false),
            idle_lock: Mutex::new(()),
            idle: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(cfg.workers);
        for n in 0..cfg.workers {
            let rx = receiver.clone();
            let shared = shared.clone();
            let handle = std::thread::Builder::new()
                .name(format!("{}-{n}", cfg.thread_name_prefix))
                .spawn(move || worker_loop(rx, shared))?;
            workers.push(handle);
        }

        tracing::debug!(
            workers = cfg.workers,
            name = %cfg.thread_name_prefix,
            "worker pool started"
        );

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            receiver,
            workers: Mutex::new(workers),
            shared,
            name: cfg.thread_name_prefix.clone(),
            size: cfg.workers,
        })
    }

    /// Queue `op` and return a handle to its result.
    ///
    /// `label` names the operation in failure logs.  After shutdown the
    /// handle resolves immediately to [`Error::PoolShutdown`].
    pub fn submit<T, F>(&self, label: &'static str, op: F) -> PoolFuture<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(op)) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => {
                    tracing::warn!(op = label, error = %e, "store operation failed");
                    Err(e)
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(op = label, panic = %message, "store operation panicked");
                    Err(Error::TaskPanicked(message))
                }
            };
            // The caller may have dropped the handle; that is fine.
            let _ = tx.send(outcome);
        });

        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            return PoolFuture::ready(Err(Error::PoolShutdown));
        };
        self.shared.queued.fetch_add(1, Ordering::AcqRel);
        if sender.send(job).is_err() {
            self.shared.queued.fetch_sub(1, Ordering::AcqRel);
            return PoolFuture::ready(Err(Error::PoolShutdown));
        }
        PoolFuture::pending(rx)
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.queued.load(Ordering::Acquire)
    }

    /// Jobs currently running.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn is_shut_down(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Stop the pool, waiting at most `drain` for outstanding work.
    ///
    /// `Duration::ZERO` halts immediately.  Calling this twice is a no-op
    /// that returns a default report.
    pub fn shutdown(&self, drain: Duration) -> ShutdownReport {
        // Dropping the only sender lets idle workers exit once the queue
        // is empty.
        if self.sender.lock().take().is_none() {
            return ShutdownReport::default();
        }
        tracing::debug!(
            pool = %self.name,
            queued = self.queued(),
            in_flight = self.in_flight(),
            drain_ms = drain.as_millis() as u64,
            "stopping worker pool"
        );

        let drained = self.wait_idle(drain);

        let mut dropped = 0;
        let mut abandoned = 0;
        if drained {
            for handle in self.workers.lock().drain(..) {
                if handle.join().is_err() {
                    tracing::error!(pool = %self.name, "worker thread exited abnormally");
                }
            }
        } else {
            self.shared.halted.store(true, Ordering::Release);
            while let Ok(job) = self.receiver.try_recv() {
                self.shared.queued.fetch_sub(1, Ordering::AcqRel);
                drop(job);
                dropped += 1;
            }
            dropped += self.shared.discarded.load(Ordering::Acquire);
            abandoned = self.in_flight();
            // Busy workers are detached; they exit after their current job.
            self.workers.lock().clear();
        }

        tracing::info!(
            pool = %self.name,
            drained,
            dropped,
            abandoned,
            "worker pool shut down"
        );
        TraceEvent::PoolStopped {
            workers: self.size,
            dropped_jobs: dropped,
            abandoned_jobs: abandoned,
        }
        .emit();

        ShutdownReport {
            drained,
            dropped,
            abandoned,
        }
    }

    fn wait_idle(&self, drain: Duration) -> bool {
        let deadline = Instant::now() + drain;
        let mut guard = self.shared.idle_lock.lock();
        while !self.shared.is_idle() {
            if self
                .shared
                .idle
                .wait_until(&mut guard, deadline)
                .timed_out()
            {
                return self.shared.is_idle();
            }
        }
        true
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Let the workers run out the queue and exit on their own.
        self.sender.lock().take();
    }
}

fn worker_loop(rx: Receiver<Job>, shared: Arc<Shared>) {
    while let Ok(job) = rx.recv() {
        if shared.halted.load(Ordering::Acquire) {
            shared.discarded.fetch_add(1, Ordering::AcqRel);
            shared.queued.fetch_sub(1, Ordering::AcqRel);
            drop(job);
            continue;
        }
        // Count the job as running before it leaves the queue count, so
        // the pool never looks idle while a job changes hands.
        shared.in_flight.fetch_add(1, Ordering::AcqRel);
        shared.queued.fetch_sub(1, Ordering::AcqRel);
        job();
        shared.in_flight.fetch_sub(1, Ordering::AcqRel);
        shared.notify_idle();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn pool(workers: usize) -> WorkerPool {
        WorkerPool::new(&ExecutorConfig {
            workers,
            thread_name_prefix: "test-worker".into(),
            shutdown_drain_ms: 0,
        })
        .unwrap()
    }

    #[test]
    fn runs_operation_and_returns_value() {
        let pool = pool(2);
        let value = pool.submit("add", || Ok(2 + 2)).wait().unwrap();
        assert_eq!(value, 4);
    }

    #[test]
    fn workers_are_named() {
        let pool = pool(1);
        let name = pool
            .submit("name", || {
                Ok(std::thread::current().name().map(str::to_owned))
            })
            .wait()
            .unwrap();
        assert_eq!(name.as_deref(), Some("test-worker-0"));
    }

    #[test]
    fn error_resolves_future_and_pool_survives() {
        let pool = pool(1);
        let err = pool
            .submit::<(), _>("fail", || Err(Error::Store("boom".into())))
            .wait()
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));

        assert_eq!(pool.submit("after", || Ok(7)).wait().unwrap(), 7);
    }

    #[test]
    fn panic_resolves_future_and_worker_survives() {
        let pool = pool(1);
        let err = pool
            .submit::<(), _>("panic", || panic!("kaboom"))
            .wait()
            .unwrap_err();
        match err {
            Error::TaskPanicked(msg) => assert!(msg.contains("kaboom")),
            other => panic!("unexpected error: {other:?}"),
        }

        // Same single worker still serves.
        assert_eq!(pool.submit("after", || Ok(1)).wait().unwrap(), 1);
    }

    #[test]
    fn runs_jobs_in_parallel() {
        let pool = pool(4);
        let barrier = Arc::new(std::sync::Barrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let barrier = barrier.clone();
                pool.submit("barrier", move || {
                    barrier.wait();
                    Ok(())
                })
            })
            .collect();
        for h in handles {
            h.wait().unwrap();
        }
    }

    #[test]
    fn submit_after_shutdown_is_rejected() {
        let pool = pool(1);
        pool.shutdown(Duration::from_millis(100));
        assert!(pool.is_shut_down());
        let err = pool.submit("late", || Ok(())).wait().unwrap_err();
        assert!(matches!(err, Error::PoolShutdown));
    }

    #[test]
    fn graceful_drain_completes_pending_work() {
        let pool = pool(1);
        let done = Arc::new(AtomicU32::new(0));
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let done = done.clone();
                pool.submit("slow", move || {
                    std::thread::sleep(Duration::from_millis(10));
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        let report = pool.shutdown(Duration::from_secs(5));
        assert!(report.drained);
        assert_eq!(report.dropped, 0);
        assert_eq!(done.load(Ordering::SeqCst), 5);
        for h in handles {
            h.wait().unwrap();
        }
    }

    #[test]
    fn forced_shutdown_cancels_queued_jobs() {
        let pool = pool(1);
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let blocker = pool.submit("block", move || {
            started_tx.send(()).unwrap();
            let _ = release_rx.recv();
            Ok(())
        });
        started_rx.recv().unwrap();

        let queued: Vec<_> = (0..3).map(|_| pool.submit("queued", || Ok(()))).collect();
        assert_eq!(pool.queued(), 3);
        assert_eq!(pool.in_flight(), 1);

        let report = pool.shutdown(Duration::ZERO);
        assert!(!report.drained);
        assert_eq!(report.dropped, 3);
        assert_eq!(report.abandoned, 1);
        for q in queued {
            assert!(matches!(q.wait(), Err(Error::Cancelled)));
        }

        // The detached job still finishes and reports back.
        release_tx.send(()).unwrap();
        blocker.wait().unwrap();
    }

    #[test]
    fn halted_worker_discards_without_running() {
        let shared = Arc::new(Shared {
            queued: AtomicUsize::new(2),
            in_flight: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
            halted: AtomicBool::new(true),
            idle_lock: Mutex::new(()),
            idle: Condvar::new(),
        });
        let ran = Arc::new(AtomicU32::new(0));
        let (tx, rx) = channel::unbounded::<Job>();
        for _ in 0..2 {
            let ran = ran.clone();
            tx.send(Box::new(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }
        drop(tx);

        worker_loop(rx, shared.clone());

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(shared.discarded.load(Ordering::SeqCst), 2);
        assert_eq!(shared.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(shared.queued.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn second_shutdown_is_noop() {
        let pool = pool(1);
        pool.shutdown(Duration::from_millis(50));
        assert_eq!(pool.shutdown(Duration::from_millis(50)), ShutdownReport::default());
    }

    #[tokio::test]
    async fn future_can_be_awaited() {
        let pool = pool(1);
        let value = pool.submit("await", || Ok("ok")).await.unwrap();
        assert_eq!(value, "ok");
    }

    #[test]
    fn zero_workers_is_a_config_error() {
        let err = WorkerPool::new(&ExecutorConfig {
            workers: 0,
            ..ExecutorConfig::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
