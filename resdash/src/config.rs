//! Configuration management.
//!
//! Configuration is loaded from three sources, each overriding the previous:
//!
//! 1. **YAML file** (default `config.yaml`, or `-f <path>` / `RESDASH_CONFIG`)
//! 2. **`RESDASH_`-prefixed environment variables**, with `__` separating nested keys
//!    (e.g. `RESDASH_DATABASE__MAX_CONNECTIONS=10`)
//! 3. **Plain `DB_*` variables** for the database connection, so deployments that
//!    already export `DB_HOST`, `DB_USER` and friends keep working
//!
//! ```yaml
//! host: "0.0.0.0"
//! port: 3001
//! api_prefix: "/api"
//!
//! database:
//!   host: "db.internal"
//!   user: "dashboard"
//!   password: "secret"
//!   database: "inventory"
//!   max_connections: 5
//!   queue_limit: 0
//!
//! portal:
//!   featured: "Agu"
//!   links:
//!     Agu: "https://portal.azure.com/#@tenant/resource/subscriptions/.../resourceGroups/agu"
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::api::models::links::PortalLinks;
use crate::errors::Error;

/// Plain environment variables carrying text, taken verbatim.
const DATABASE_TEXT_ENV: [(&str, &str); 4] = [
    ("DB_HOST", "database.host"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_DATABASE", "database.database"),
];

/// Plain environment variables carrying numbers.
const DATABASE_NUMERIC_ENV: [(&str, &str); 4] = [
    ("DB_PORT", "database.port"),
    ("DB_CONNECTION_LIMIT", "database.max_connections"),
    ("DB_QUEUE_LIMIT", "database.queue_limit"),
    ("DB_CONNECT_TIMEOUT", "database.connect_timeout_ms"),
];

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "RESDASH_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Path the API routes are mounted under
    pub api_prefix: String,
    /// Connection settings for the `resources` database
    pub database: DatabaseConfig,
    /// Portal deep links served to clients
    pub portal: PortalLinks,
    pub cors: CorsConfig,
    /// Serve Prometheus metrics at `/internal/metrics`
    pub enable_metrics: bool,
    /// Export traces over OTLP (configured through the standard `OTEL_*` variables)
    pub enable_otel_export: bool,
}

/// MySQL connection settings.
///
/// Nothing here is checked at startup: the pool is built lazily on the first request,
/// and a missing host or user surfaces as a failed request rather than a crash.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(deserialize_with = "scalar_string")]
    pub host: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub user: Option<String>,
    #[serde(skip_serializing, deserialize_with = "scalar_string")]
    pub password: Option<String>,
    /// Schema to select; the server default is used when unset
    #[serde(deserialize_with = "scalar_string")]
    pub database: Option<String>,
    pub port: u16,
    /// Maximum number of open connections
    pub max_connections: u32,
    /// Callers allowed to wait for a connection beyond `max_connections`; 0 is unbounded
    pub queue_limit: usize,
    /// How long an acquire may take, including establishing a new connection
    pub connect_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: None,
            user: None,
            password: None,
            database: None,
            port: 3306,
            max_connections: 5,
            queue_limit: 0,
            connect_timeout_ms: 10_000,
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins; empty means same-origin only
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allow_credentials: false,
            max_age: Some(3600),
        }
    }
}

/// CORS origin: either `*` or a specific URL.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

/// Accepts any scalar as text, so `password: 123456` in YAML or
/// `RESDASH_DATABASE__DATABASE=2024` still read as strings.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }

    let value: Option<Scalar> = Deserialize::deserialize(deserializer)?;
    Ok(value.map(|scalar| match scalar {
        Scalar::Text(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            api_prefix: "/api".to_string(),
            database: DatabaseConfig::default(),
            portal: PortalLinks::default(),
            cors: CorsConfig::default(),
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections must be at least 1"));
        }

        if !self.api_prefix.starts_with('/') {
            return Err(invalid(format!("api_prefix must start with '/' (got '{}')", self.api_prefix)));
        }

        if let Some(featured) = self.portal.featured.as_deref() {
            if !self.portal.links.contains_key(featured) {
                return Err(invalid(format!("portal.featured '{featured}' has no entry in portal.links")));
            }
        }

        if self.cors.allow_credentials && self.cors.allowed_origins.contains(&CorsOrigin::Wildcard) {
            return Err(invalid("cors.allow_credentials cannot be combined with a '*' origin"));
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        let figment = Figment::new()
            .merge(Yaml::file(&args.config))
            // The config file path and the console's API URL share the prefix but are not keys
            .merge(Env::prefixed("RESDASH_").ignore(&["CONFIG", "API_URL"]).split("__"))
            .merge(Env::raw().filter_map(|var| database_key(&DATABASE_NUMERIC_ENV, var.as_str()).map(Into::into)));

        // Env parses values ("007" becomes 7, "[x]" an array), so text settings bypass it
        Env::raw()
            .filter_map(|var| database_key(&DATABASE_TEXT_ENV, var.as_str()).map(Into::into))
            .iter()
            .fold(figment, |figment, (key, value)| {
                figment.merge(Serialized::default(key.as_str(), value))
            })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The API prefix without a trailing slash, suitable for `Router::nest`.
    pub fn api_base(&self) -> &str {
        self.api_prefix.trim_end_matches('/')
    }
}

fn database_key(table: &[(&str, &'static str)], var: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(var))
        .map(|(_, key)| *key)
}

fn invalid(reason: impl std::fmt::Display) -> Error {
    Error::Internal {
        operation: format!("validate configuration: {reason}"),
    }
}
