//! In-process [`LeaseStore`] with Redis-like TTL and SCAN behaviour.
//!
//! Every key is assigned a slot number when first written.  Scan cursors
//! are slot numbers, so deleting keys mid-scan never causes the iteration
//! to skip or repeat surviving keys.  `COUNT` bounds the number of slots
//! examined per call, not the number of matches returned, as in Redis.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glob::Pattern;
use parking_lot::Mutex;
use vl_domain::clock::{Clock, SystemClock};
use vl_domain::error::{Error, Result};

use crate::store::{ttl_secs, LeaseStore, ScanPage, INITIAL_CURSOR};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
    slot: u64,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Default)]
struct Keyspace {
    entries: HashMap<String, Entry>,
    slots: BTreeMap<u64, String>,
    next_slot: u64,
}

impl Keyspace {
    fn live(&self, key: &str, now: Instant) -> Option<&Entry> {
        self.entries.get(key).filter(|e| e.is_live(now))
    }

    fn insert(&mut self, key: &str, value: &str, expires_at: Instant, now: Instant) {
        // An overwrite of a live key keeps its slot so an in-progress scan
        // still visits it exactly once.
        let slot = match self.live(key, now) {
            Some(existing) => existing.slot,
            None => {
                self.remove(key);
                self.next_slot += 1;
                self.slots.insert(self.next_slot, key.to_owned());
                self.next_slot
            }
        };
        self.entries.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at: Some(expires_at),
                slot,
            },
        );
    }

    fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.slots.remove(&entry.slot);
        Some(entry)
    }
}

/// A thread-safe in-memory lease store.
pub struct MemoryStore {
    keyspace: Mutex<Keyspace>,
    clock: Arc<dyn Clock>,
    open: AtomicBool,
    scans: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            keyspace: Mutex::new(Keyspace::default()),
            clock,
            open: AtomicBool::new(true),
            scans: AtomicU64::new(0),
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.keyspace
            .lock()
            .entries
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time left before `key` expires, if it is live.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let keyspace = self.keyspace.lock();
        let entry = keyspace.live(key, now)?;
        entry.expires_at.map(|at| at.saturating_duration_since(now))
    }

    /// Total `scan` calls served so far.
    pub fn scan_calls(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::Store("connection to memory store is closed".into()))
        }
    }

    fn expiry(&self, ttl: Duration) -> (Instant, Instant) {
        let now = self.clock.now();
        (now, now + Duration::from_secs(ttl_secs(ttl)))
    }
}

impl LeaseStore for MemoryStore {
    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.ensure_open()?;
        let (now, expires_at) = self.expiry(ttl);
        self.keyspace.lock().insert(key, value, expires_at, now);
        Ok(())
    }

    fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        self.ensure_open()?;
        let (now, expires_at) = self.expiry(ttl);
        let mut keyspace = self.keyspace.lock();
        if keyspace.live(key, now).is_some() {
            return Ok(false);
        }
        keyspace.insert(key, value, expires_at, now);
        Ok(true)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        let now = self.clock.now();
        let keyspace = self.keyspace.lock();
        Ok(keyspace.live(key, now).map(|e| e.value.clone()))
    }

    fn del(&self, keys: &[String]) -> Result<u64> {
        self.ensure_open()?;
        let now = self.clock.now();
        let mut keyspace = self.keyspace.lock();
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = keyspace.remove(key) {
                if entry.is_live(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        self.ensure_open()?;
        self.scans.fetch_add(1, Ordering::Relaxed);

        let matcher = Pattern::new(pattern)
            .map_err(|e| Error::Store(format!("invalid scan pattern {pattern:?}: {e}")))?;
        let now = self.clock.now();
        let mut keyspace = self.keyspace.lock();

        let examined: Vec<(u64, String)> = keyspace
            .slots
            .range(cursor.max(1)..)
            .take(count.max(1))
            .map(|(slot, key)| (*slot, key.clone()))
            .collect();

        let mut keys = Vec::new();
        let mut expired = Vec::new();
        for (_, key) in &examined {
            match keyspace.entries.get(key) {
                Some(entry) if entry.is_live(now) => {
                    if matcher.matches(key) {
                        keys.push(key.clone());
                    }
                }
                _ => expired.push(key.clone()),
            }
        }
        for key in &expired {
            keyspace.remove(key);
        }

        let next = examined
            .last()
            .and_then(|(last, _)| keyspace.slots.range(last + 1..).next())
            .map_or(INITIAL_CURSOR, |(slot, _)| *slot);

        Ok(ScanPage {
            cursor: next,
            keys,
            finished: next == INITIAL_CURSOR,
        })
    }

    fn ping(&self) -> Result<()> {
        self.ensure_open()
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}
