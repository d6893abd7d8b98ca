//! Database layer.
//!
//! The service reads a single MySQL table. Everything here is about owning the
//! connection pool well rather than about data modelling:
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers, via `dyn Database`)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │PoolAccessor │  (lazy init, reset on pool fault)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ MySQL pool  │  (sqlx, queue-limit gate)
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`pool`]: pool seams, the memoizing accessor, and the [`pool::Database`] trait handlers use
//! - [`mysql`]: sqlx-backed MySQL pool and row-to-JSON conversion
//! - [`queue`]: admission gate implementing the queue limit
//! - [`errors`]: database-specific error types

pub mod errors;
pub mod mysql;
pub mod pool;
pub mod queue;

use crate::config::DatabaseConfig;
use mysql::MySqlPoolFactory;
use pool::PoolAccessor;

/// The accessor used by the running server.
pub type MySqlAccessor = PoolAccessor<MySqlPoolFactory>;

/// Build the production accessor. No connection is attempted until the first request.
pub fn mysql_accessor(settings: &DatabaseConfig) -> MySqlAccessor {
    PoolAccessor::new(MySqlPoolFactory::new(settings.clone()))
}
