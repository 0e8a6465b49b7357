//! Redis implementation of [`LeaseStore`].
//!
//! `RedisStore` holds a single synchronous connection behind a mutex, so
//! concurrent callers serialize on it.  Connect and socket timeouts come
//! from [`StoreConfig`]; there is no retry.  A failed command surfaces as
//! [`Error::Store`] and the caller decides what to do.

use std::time::Duration;

use ::redis::{
    Client, Connection, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError,
    RedisResult,
};
use parking_lot::Mutex;
use vl_domain::config::StoreConfig;
use vl_domain::error::{Error, Result};

use crate::store::{ttl_secs, LeaseStore, ScanPage};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A blocking client for a Redis-compatible lease store.
///
/// Created once at startup and shared for the lifetime of the process.
pub struct RedisStore {
    conn: Mutex<Option<Connection>>,
    endpoint: String,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("endpoint", &self.endpoint)
            .field("open", &self.is_open())
            .finish()
    }
}

impl RedisStore {
    /// Connect using the shared `StoreConfig`.
    pub fn connect(cfg: &StoreConfig) -> Result<Self> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(cfg.host.clone(), cfg.port),
            redis: RedisConnectionInfo {
                db: cfg.database,
                username: cfg.user.clone().filter(|u| !u.is_empty()),
                password: cfg.password.clone().filter(|p| !p.is_empty()),
                ..Default::default()
            },
        };

        let client = Client::open(info).map_err(store_err)?;
        let conn = client
            .get_connection_with_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .map_err(store_err)?;

        let io_timeout = Some(Duration::from_millis(cfg.io_timeout_ms));
        conn.set_read_timeout(io_timeout).map_err(store_err)?;
        conn.set_write_timeout(io_timeout).map_err(store_err)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            endpoint: format!("{}:{}/{}", cfg.host, cfg.port, cfg.database),
        })
    }

    /// `host:port/db`, for logs.  Never includes credentials.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> RedisResult<T>) -> Result<T> {
        let mut guard = self.conn.lock();
        let conn = guard
            .as_mut()
            .ok_or_else(|| Error::Store(format!("connection to {} is closed", self.endpoint)))?;
        f(conn).map_err(store_err)
    }
}

fn store_err(e: RedisError) -> Error {
    Error::Store(e.to_string())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl LeaseStore for RedisStore {
    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.with_conn(|conn| {
            ::redis::cmd("SETEX")
                .arg(key)
                .arg(ttl_secs(ttl))
                .arg(value)
                .query::<()>(conn)
        })
    }

    fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let reply: Option<String> = self.with_conn(|conn| {
            ::redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .arg("EX")
                .arg(ttl_secs(ttl))
                .query(conn)
        })?;
        Ok(reply.is_some())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| ::redis::cmd("GET").arg(key).query(conn))
    }

    fn del(&self, keys: &[String]) -> Result<u64> {
        // DEL with no arguments is a protocol error.
        if keys.is_empty() {
            return Ok(0);
        }
        self.with_conn(|conn| ::redis::cmd("DEL").arg(keys).query(conn))
    }

    fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        let (next, keys): (u64, Vec<String>) = self.with_conn(|conn| {
            ::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(count)
                .query(conn)
        })?;
        Ok(ScanPage {
            cursor: next,
            keys,
            finished: next == crate::store::INITIAL_CURSOR,
        })
    }

    fn ping(&self) -> Result<()> {
        let pong: String = self.with_conn(|conn| ::redis::cmd("PING").query(conn))?;
        if pong.eq_ignore_ascii_case("PONG") {
            Ok(())
        } else {
            Err(Error::Store(format!("unexpected PING reply: {pong}")))
        }
    }

    fn close(&self) {
        if self.conn.lock().take().is_some() {
            tracing::info!(endpoint = %self.endpoint, "lease store connection closed");
        }
    }

    fn is_open(&self) -> bool {
        self.conn.lock().is_some()
    }
}
