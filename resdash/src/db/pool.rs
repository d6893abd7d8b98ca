//! Lazily built, self-healing connection pool.
//!
//! [`PoolAccessor`] owns at most one live pool at a time. The pool is built on the
//! first call to [`PoolAccessor::get`] and memoized for every later caller. When a
//! caller observes a pool-level fault (see [`DbError::is_pool_fault`]) it reports it
//! through [`PoolAccessor::report_fault`]; the accessor drops the memoized handle
//! and the next request builds a fresh pool.
//!
//! ```text
//!  request ──get()──▶ ┌──────────────┐   first call / after fault
//!                     │ PoolAccessor │ ───────────────────────────▶ PoolFactory::create
//!  fault ──report──▶  └──────┬───────┘
//!                            │ Arc<Pool>
//!                            ↓
//!                     ConnectionPool ──acquire──▶ PooledConnection (released on drop)
//! ```
//!
//! The accessor is generic over [`PoolFactory`] so handlers can be exercised against
//! an in-memory pool; the MySQL implementation lives in [`crate::db::mysql`].

use async_trait::async_trait;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, instrument, warn};

use crate::api::models::resources::Resource;
use crate::db::errors::{DbError, Result};

/// A connection checked out of a [`ConnectionPool`].
///
/// Dropping the value returns the connection to its pool, so every exit path of a
/// caller releases it.
#[async_trait]
pub trait PooledConnection: Send {
    /// Minimal round trip proving the connection is usable.
    async fn ping(&mut self) -> Result<()>;
}

/// A bounded set of reusable database connections.
#[async_trait]
pub trait ConnectionPool: Send + Sync + 'static {
    type Connection: PooledConnection;

    /// Check out a connection, waiting for one to free up if the pool is saturated.
    async fn acquire(&self) -> Result<Self::Connection>;

    /// Run a parameterless statement on whichever connection is free and return all rows.
    async fn fetch_all(&self, sql: &str) -> Result<Vec<Resource>>;

    /// Close every connection; outstanding checkouts are waited for.
    async fn close(&self);
}

/// Builds a new pool. Called once on first use and again after every reset.
pub trait PoolFactory: Send + Sync + 'static {
    type Pool: ConnectionPool;

    fn create(&self) -> Result<Self::Pool>;
}

/// Process-wide owner of the current pool handle.
pub struct PoolAccessor<F: PoolFactory> {
    factory: F,
    current: RwLock<Option<Arc<F::Pool>>>,
    // Serializes creation so concurrent first callers share one pool
    init_lock: Mutex<()>,
}

impl<F: PoolFactory> PoolAccessor<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            current: RwLock::new(None),
            init_lock: Mutex::new(()),
        }
    }

    /// Get the current pool, building it if there is none.
    ///
    /// Idempotent while healthy: repeated calls return the same `Arc`.
    pub fn get(&self) -> Result<Arc<F::Pool>> {
        if let Some(pool) = self.load() {
            return Ok(pool);
        }

        let _guard = self.init_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pool) = self.load() {
            return Ok(pool);
        }

        info!("Initializing database connection pool");
        let pool = Arc::new(self.factory.create().inspect_err(|e| {
            tracing::error!("Failed to create database pool: {}", e);
        })?);
        *self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(pool.clone());
        info!("Database connection pool initialized");

        Ok(pool)
    }

    /// Error observer: discard `pool` if `err` shows it is no longer usable.
    ///
    /// Only the handle the caller actually used is discarded. If another request has
    /// already replaced it, the newer pool is left alone. Returns whether a reset
    /// happened.
    #[instrument(skip_all, fields(fault = %err))]
    pub fn report_fault(&self, pool: &Arc<F::Pool>, err: &DbError) -> bool {
        if !err.is_pool_fault() {
            return false;
        }

        let stale = {
            let mut current = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            match current.as_ref() {
                Some(active) if Arc::ptr_eq(active, pool) => current.take(),
                _ => None,
            }
        };

        match stale {
            Some(stale) => {
                warn!("Database pool error, pool will be re-initialized on next request");
                close_in_background(stale);
                true
            }
            None => false,
        }
    }

    /// Discard the current pool unconditionally. Returns whether one was live.
    pub fn reset(&self) -> bool {
        let stale = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner()).take();
        match stale {
            Some(stale) => {
                info!("Database connection pool reset");
                close_in_background(stale);
                true
            }
            None => false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.load().is_some()
    }

    /// Close the current pool, if any, and wait for it to drain.
    pub async fn close(&self) {
        let current = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner()).take();
        if let Some(pool) = current {
            pool.close().await;
        }
    }

    fn load(&self) -> Option<Arc<F::Pool>> {
        self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

fn close_in_background<P: ConnectionPool>(pool: Arc<P>) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move { pool.close().await });
        }
        // Outside a runtime the pool is simply dropped
        Err(_) => drop(pool),
    }
}

/// Database operations the HTTP handlers need, independent of the pool type.
#[async_trait]
pub trait Database: Send + Sync {
    /// Acquire one connection, ping it, and release it.
    async fn check_connection(&self) -> Result<()>;

    /// Run the fixed listing query against the `resources` table.
    async fn list_resources(&self) -> Result<Vec<Resource>>;

    /// Close the current pool on shutdown.
    async fn close(&self);
}

/// The listing query. It takes no parameters and returns every row.
pub const LIST_RESOURCES_SQL: &str = "SELECT * FROM resources";

#[async_trait]
impl<F: PoolFactory> Database for PoolAccessor<F> {
    async fn check_connection(&self) -> Result<()> {
        let pool = self.get()?;
        let outcome: Result<()> = async {
            let mut conn = pool.acquire().await?;
            conn.ping().await
            // conn dropped here, on success and on ping failure alike
        }
        .await;

        if let Err(e) = &outcome {
            self.report_fault(&pool, e);
        }
        outcome
    }

    async fn list_resources(&self) -> Result<Vec<Resource>> {
        let pool = self.get()?;
        let outcome = pool.fetch_all(LIST_RESOURCES_SQL).await;

        if let Err(e) = &outcome {
            self.report_fault(&pool, e);
        }
        outcome
    }

    async fn close(&self) {
        PoolAccessor::close(self).await;
    }
}
