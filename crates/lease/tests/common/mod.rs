//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use vl_domain::clock::ManualClock;
use vl_domain::config::Config;
use vl_domain::error::{Error, Result};
use vl_lease::LeaseManager;
use vl_store::{LeaseStore, MemoryStore, ScanPage};

pub fn config(prefix: &str) -> Config {
    let mut config = Config::default();
    config.store.prefix = prefix.into();
    config.executor.workers = 4;
    config.executor.thread_name_prefix = format!("{prefix}-worker");
    config
}

pub fn manager_on(store: Arc<dyn LeaseStore>, config: &Config) -> Arc<LeaseManager> {
    Arc::new(LeaseManager::new(store, config).unwrap())
}

pub fn memory_with_clock() -> (Arc<MemoryStore>, ManualClock) {
    let clock = ManualClock::new();
    (Arc::new(MemoryStore::with_clock(Arc::new(clock.clone()))), clock)
}

/// Wraps a [`MemoryStore`] and fails every command while `down` is set.
pub struct FlakyStore {
    pub inner: MemoryStore,
    down: AtomicBool,
    pub panic_next: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            down: AtomicBool::new(false),
            panic_next: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("store client blew up");
        }
        if self.down.load(Ordering::SeqCst) {
            Err(Error::Store("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

impl LeaseStore for FlakyStore {
    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.check()?;
        self.inner.set_ex(key, value, ttl)
    }

    fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        self.check()?;
        self.inner.set_nx_ex(key, value, ttl)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        self.inner.get(key)
    }

    fn del(&self, keys: &[String]) -> Result<u64> {
        self.check()?;
        self.inner.del(keys)
    }

    fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        self.check()?;
        self.inner.scan(cursor, pattern, count)
    }

    fn ping(&self) -> Result<()> {
        self.check()
    }

    fn close(&self) {
        self.inner.close();
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }
}

/// A store whose scan never completes: it cycles cursors 1, 2, 3, 1, ...
/// and always returns one fresh key.
#[derive(Default)]
pub struct EndlessScanStore {
    pub scans: AtomicU32,
    pub deletes: AtomicU32,
    closed: AtomicBool,
}

impl LeaseStore for EndlessScanStore {
    fn set_ex(&self, _: &str, _: &str, _: Duration) -> Result<()> {
        Ok(())
    }

    fn set_nx_ex(&self, _: &str, _: &str, _: Duration) -> Result<bool> {
        Ok(true)
    }

    fn get(&self, _: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn del(&self, keys: &[String]) -> Result<u64> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(keys.len() as u64)
    }

    fn scan(&self, cursor: u64, _: &str, _: usize) -> Result<ScanPage> {
        let n = self.scans.fetch_add(1, Ordering::SeqCst);
        Ok(ScanPage {
            cursor: cursor % 3 + 1,
            keys: vec![format!("ax:{n}:lock")],
            finished: false,
        })
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

/// A store whose every scan returns the same single-key page, with a fixed
/// cursor and completion flag.
pub struct OnePageStore {
    cursor: u64,
    finished: bool,
    pub scans: AtomicU32,
    pub deleted: AtomicU32,
}

impl OnePageStore {
    /// Reports completion only through `finished`; the cursor stays non-zero.
    pub fn finished_flag() -> Self {
        Self::new(7, true)
    }

    /// Reports completion only by returning cursor 0.
    pub fn zero_cursor() -> Self {
        Self::new(0, false)
    }

    fn new(cursor: u64, finished: bool) -> Self {
        Self {
            cursor,
            finished,
            scans: AtomicU32::new(0),
            deleted: AtomicU32::new(0),
        }
    }
}

impl LeaseStore for OnePageStore {
    fn set_ex(&self, _: &str, _: &str, _: Duration) -> Result<()> {
        Ok(())
    }

    fn set_nx_ex(&self, _: &str, _: &str, _: Duration) -> Result<bool> {
        Ok(true)
    }

    fn get(&self, _: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn del(&self, keys: &[String]) -> Result<u64> {
        self.deleted.fetch_add(keys.len() as u32, Ordering::SeqCst);
        Ok(keys.len() as u64)
    }

    fn scan(&self, _: u64, _: &str, _: usize) -> Result<ScanPage> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        Ok(ScanPage {
            cursor: self.cursor,
            keys: vec!["ax:only:lock".into()],
            finished: self.finished,
        })
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) {}

    fn is_open(&self) -> bool {
        true
    }
}
