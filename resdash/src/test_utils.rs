//! Test utilities (available with the `test-utils` feature).
//!
//! [`FakePoolFactory`] stands in for MySQL: it builds in-memory pools that serve
//! canned rows, count every checkout, and fail on demand.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::api::models::resources::Resource;
use crate::config::Config;
use crate::db::errors::{DbError, Result};
use crate::db::pool::{ConnectionPool, PoolFactory, PooledConnection};

/// How pools built by a [`FakePoolFactory`] behave. Read on every call, so a change
/// also affects pools that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FakeBehaviour {
    #[default]
    Healthy,
    /// `create` fails as if host/user were missing
    FailConstruction,
    /// `acquire` times out waiting for a connection
    FailAcquire,
    /// `acquire` succeeds but the ping hits a broken socket
    FailPing,
    /// The listing statement fails (e.g. missing table); the pool stays usable
    FailQuery,
}

/// Counters shared by a factory and every pool it builds.
#[derive(Debug, Default)]
pub struct FakeStats {
    pools_created: AtomicUsize,
    pools_closed: AtomicUsize,
    acquired: AtomicUsize,
    released: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl FakeStats {
    pub fn pools_created(&self) -> usize {
        self.pools_created.load(Ordering::SeqCst)
    }

    pub fn pools_closed(&self) -> usize {
        self.pools_closed.load(Ordering::SeqCst)
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[derive(Debug, Default)]
struct Shared {
    behaviour: Mutex<FakeBehaviour>,
    rows: Vec<Resource>,
    stats: Arc<FakeStats>,
}

impl Shared {
    fn behaviour(&self) -> FakeBehaviour {
        *self.behaviour.lock().unwrap()
    }
}

/// In-memory [`PoolFactory`]. Clones share behaviour and counters.
#[derive(Debug, Clone, Default)]
pub struct FakePoolFactory {
    shared: Arc<Shared>,
}

impl FakePoolFactory {
    /// A factory whose pools return `rows` for every query. Each value must be a JSON object.
    pub fn with_rows(rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| match row {
                Value::Object(fields) => Resource::new(fields),
                other => panic!("fake rows must be JSON objects, got {other}"),
            })
            .collect();

        Self {
            shared: Arc::new(Shared {
                rows,
                ..Default::default()
            }),
        }
    }

    pub fn set_behaviour(&self, behaviour: FakeBehaviour) {
        *self.shared.behaviour.lock().unwrap() = behaviour;
    }

    pub fn stats(&self) -> Arc<FakeStats> {
        self.shared.stats.clone()
    }
}

impl PoolFactory for FakePoolFactory {
    type Pool = FakePool;

    fn create(&self) -> Result<FakePool> {
        if self.shared.behaviour() == FakeBehaviour::FailConstruction {
            return Err(DbError::construction("database.host is not set"));
        }
        self.shared.stats.pools_created.fetch_add(1, Ordering::SeqCst);
        Ok(FakePool {
            shared: self.shared.clone(),
        })
    }
}

#[derive(Debug)]
pub struct FakePool {
    shared: Arc<Shared>,
}

pub struct FakeConnection {
    shared: Arc<Shared>,
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        self.shared.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}

fn broken_pipe() -> DbError {
    DbError::from(sqlx::Error::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe")))
}

#[async_trait]
impl PooledConnection for FakeConnection {
    async fn ping(&mut self) -> Result<()> {
        match self.shared.behaviour() {
            FakeBehaviour::FailPing => Err(broken_pipe()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ConnectionPool for FakePool {
    type Connection = FakeConnection;

    async fn acquire(&self) -> Result<FakeConnection> {
        if self.shared.behaviour() == FakeBehaviour::FailAcquire {
            return Err(DbError::from(sqlx::Error::PoolTimedOut));
        }
        self.shared.stats.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(FakeConnection {
            shared: self.shared.clone(),
        })
    }

    async fn fetch_all(&self, sql: &str) -> Result<Vec<Resource>> {
        self.shared.stats.queries.lock().unwrap().push(sql.to_string());
        match self.shared.behaviour() {
            FakeBehaviour::FailQuery => Err(DbError::Other(anyhow::anyhow!("Table 'inventory.resources' doesn't exist"))),
            FakeBehaviour::FailPing => Err(broken_pipe()),
            _ => Ok(self.shared.rows.clone()),
        }
    }

    async fn close(&self) {
        self.shared.stats.pools_closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.database.host = Some("db.test".to_string());
    config.database.user = Some("tester".to_string());
    config.database.max_connections = 1;
    config
}

/// Build a test server backed by `factory`.
#[cfg(test)]
pub fn create_test_app(factory: FakePoolFactory) -> axum_test::TestServer {
    create_test_app_with_config(factory, create_test_config())
}

#[cfg(test)]
pub fn create_test_app_with_config(factory: FakePoolFactory, config: Config) -> axum_test::TestServer {
    let db = Arc::new(crate::db::pool::PoolAccessor::new(factory));
    crate::Application::with_database(config, db)
        .expect("Failed to create application")
        .into_test_server()
}
