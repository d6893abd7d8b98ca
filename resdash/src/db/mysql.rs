//! MySQL implementation of the pool seams, backed by sqlx.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::{Column, Connection, MySql, Row, TypeInfo, ValueRef};
use tracing::{debug, instrument};

use crate::api::models::resources::Resource;
use crate::config::DatabaseConfig;
use crate::db::errors::{DbError, Result};
use crate::db::pool::{ConnectionPool, PoolFactory, PooledConnection};
use crate::db::queue::{QueueGate, QueueTicket};

/// Builds lazily-connecting MySQL pools from [`DatabaseConfig`].
#[derive(Debug, Clone)]
pub struct MySqlPoolFactory {
    settings: DatabaseConfig,
}

impl MySqlPoolFactory {
    pub fn new(settings: DatabaseConfig) -> Self {
        Self { settings }
    }

    fn connect_options(&self) -> Result<MySqlConnectOptions> {
        let host = required(self.settings.host.as_deref(), "database.host")?;
        let user = required(self.settings.user.as_deref(), "database.user")?;

        let mut options = MySqlConnectOptions::new().host(host).port(self.settings.port).username(user);
        if let Some(password) = self.settings.password.as_deref() {
            options = options.password(password);
        }
        if let Some(database) = self.settings.database.as_deref().filter(|d| !d.is_empty()) {
            options = options.database(database);
        }
        Ok(options)
    }
}

fn required<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| DbError::construction(format!("{key} is not set")))
}

impl PoolFactory for MySqlPoolFactory {
    type Pool = MySqlResourcePool;

    fn create(&self) -> Result<MySqlResourcePool> {
        if self.settings.max_connections == 0 {
            return Err(DbError::construction("database.max_connections must be at least 1"));
        }
        let options = self.connect_options()?;

        // Connections are opened on first acquire; the connect timeout bounds how long
        // an acquire may wait, including the time to establish a new connection.
        let pool = MySqlPoolOptions::new()
            .max_connections(self.settings.max_connections)
            .min_connections(0)
            .acquire_timeout(self.settings.connect_timeout())
            .connect_lazy_with(options);

        debug!(
            host = self.settings.host.as_deref().unwrap_or_default(),
            port = self.settings.port,
            max_connections = self.settings.max_connections,
            queue_limit = self.settings.queue_limit,
            "Created MySQL pool"
        );

        Ok(MySqlResourcePool {
            pool,
            gate: QueueGate::new(self.settings.max_connections, self.settings.queue_limit),
        })
    }
}

/// A sqlx MySQL pool plus the queue-limit gate.
#[derive(Debug)]
pub struct MySqlResourcePool {
    pool: MySqlPool,
    gate: QueueGate,
}

/// A checked-out MySQL connection. Returned to the pool on drop.
pub struct MySqlPooledConnection {
    conn: PoolConnection<MySql>,
    _ticket: QueueTicket,
}

#[async_trait]
impl PooledConnection for MySqlPooledConnection {
    async fn ping(&mut self) -> Result<()> {
        self.conn.ping().await?;
        Ok(())
    }
}

#[async_trait]
impl ConnectionPool for MySqlResourcePool {
    type Connection = MySqlPooledConnection;

    async fn acquire(&self) -> Result<MySqlPooledConnection> {
        let ticket = self.gate.enter()?;
        let conn = self.pool.acquire().await?;
        Ok(MySqlPooledConnection { conn, _ticket: ticket })
    }

    #[instrument(skip(self), err)]
    async fn fetch_all(&self, sql: &str) -> Result<Vec<Resource>> {
        let _ticket = self.gate.enter()?;
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_resource).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Convert a row into a JSON object keyed by column name, in column order.
pub(crate) fn row_to_resource(row: &MySqlRow) -> Result<Resource> {
    let mut fields = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let value = column_value(row, column.ordinal(), column.type_info().name())?;
        fields.insert(column.name().to_string(), value);
    }
    Ok(Resource::new(fields))
}

fn column_value(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
        unsigned if unsigned.ends_with("UNSIGNED") => Value::from(row.try_get_unchecked::<u64, _>(index)?),
        "FLOAT" => Value::from(f64::from(row.try_get::<f32, _>(index)?)),
        "DOUBLE" => Value::from(row.try_get::<f64, _>(index)?),
        // Exact decimals are kept as text rather than rounded through f64
        "DECIMAL" => Value::String(row.try_get_unchecked::<String, _>(index)?),
        // TIME is a duration (up to ±838h), not a time of day
        "TIME" => Value::String(format_time(&row.try_get::<MySqlTime, _>(index)?)),
        "DATE" => date_or_null(row.try_get::<NaiveDate, _>(index), |date| date.to_string()),
        "DATETIME" => date_or_null(row.try_get::<NaiveDateTime, _>(index), |dt| iso_timestamp(dt.and_utc())),
        "TIMESTAMP" => date_or_null(row.try_get::<DateTime<Utc>, _>(index), iso_timestamp),
        "JSON" => row.try_get::<Value, _>(index)?,
        _ => text_or_bytes(row, index)?,
    };
    Ok(value)
}

fn text_or_bytes(row: &MySqlRow, index: usize) -> Result<Value> {
    match row.try_get_unchecked::<String, _>(index) {
        Ok(text) => Ok(Value::String(text)),
        Err(_) => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
            Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        }
    }
}

/// Zero dates (`0000-00-00`) and other values chrono cannot represent read as null
/// instead of failing the whole row.
fn date_or_null<T>(decoded: std::result::Result<T, sqlx::Error>, render: impl FnOnce(T) -> String) -> Value {
    match decoded {
        Ok(value) => Value::String(render(value)),
        Err(e) => {
            debug!("Unrepresentable date value read as null: {}", e);
            Value::Null
        }
    }
}

fn format_time(time: &MySqlTime) -> String {
    let sign = if time.is_negative() { "-" } else { "" };
    let mut text = format!("{sign}{:02}:{:02}:{:02}", time.hours(), time.minutes(), time.seconds());
    if time.microseconds() != 0 {
        text.push_str(&format!(".{:06}", time.microseconds()));
    }
    text
}

fn iso_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
