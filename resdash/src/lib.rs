//! # resdash: resource dashboard service
//!
//! `resdash` lists the rows of a MySQL `resources` table for an internal admin dashboard.
//! The server is deliberately thin: one endpoint pings the database, one returns the whole
//! table as JSON, and one serves the portal deep links the dashboard shows next to each
//! record. Filtering and row expansion happen on the client.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum); database access goes through
//! sqlx. The connection pool is owned by a [`db::pool::PoolAccessor`], which builds it on the
//! first request rather than at startup, and throws it away when a request observes that it
//! is broken. The next request then builds a fresh pool, so a database restart heals without
//! restarting the service.
//!
//! ```text
//!  GET /api/check-connection ─┐
//!  GET /api/users ────────────┼──▶ dyn Database ──▶ PoolAccessor ──▶ MySQL
//!  GET /api/links ──── config ┘
//! ```
//!
//! The client side lives in this crate too: [`ui`] is a toolkit-free view-state machine
//! (`transition` + `render`) and [`client::ApiClient`] talks to the server over HTTP. The
//! `resdash-console` binary wires the two together in a terminal.
//!
//! ## Configuration
//!
//! See [`config`]. Database settings can come from YAML, `RESDASH_*` variables, or the
//! plain `DB_HOST` / `DB_USER` / `DB_PASSWORD` / `DB_DATABASE` variables.
//!
//! ## Testing
//!
//! Handlers are tested end-to-end with `axum-test` against [`test_utils::FakePoolFactory`],
//! an in-memory pool that counts checkouts and fails on demand. No MySQL server is needed.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod openapi;
pub mod telemetry;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod ui;

use axum::{
    Json, Router,
    http::{HeaderValue, Method},
    routing::get,
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use config::{CorsConfig, CorsOrigin};
use db::pool::Database;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa_scalar::{Scalar, Servable};

use crate::api::handlers::{connection, links, resources};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(Arc::new(db::mysql_accessor(&config.database)))
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub config: Config,
}

fn create_cors_layer(config: &CorsConfig) -> anyhow::Result<CorsLayer> {
    let allow_origin = if config.allowed_origins.contains(&CorsOrigin::Wildcard) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::with_capacity(config.allowed_origins.len());
        for origin in &config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins carry no path; Url always renders one
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
        .allow_credentials(config.allow_credentials);

    if let Some(max_age) = config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: API routes under the configured prefix, `/healthz`,
/// OpenAPI docs, optional Prometheus metrics, CORS, and request tracing.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route("/check-connection", get(connection::check_connection))
        .route("/users", get(resources::list_users))
        .route("/links", get(links::get_links))
        .with_state(state.clone());

    let api_base = state.config.api_base();
    let doc = openapi::api_doc(api_base);

    let router = if api_base.is_empty() {
        Router::new().merge(api_routes)
    } else {
        Router::new().nest(api_base, api_routes)
    };

    let mut router = router
        .route("/healthz", get(|| async { "OK" }))
        .route(
            "/api-docs/openapi.json",
            get({
                let doc = doc.clone();
                move || async move { Json(doc) }
            }),
        )
        .merge(Scalar::with_url("/docs", doc))
        .layer(create_cors_layer(&state.config.cors)?);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

pub struct Application {
    router: Router,
    app_state: AppState,
    config: Config,
}

impl Application {
    /// Create the application against the configured MySQL database.
    ///
    /// Does not connect: the pool is built when the first request needs it.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let db = Arc::new(db::mysql_accessor(&config.database));
        Self::with_database(config, db)
    }

    /// Create the application against any [`Database`] implementation.
    pub fn with_database(config: Config, db: Arc<dyn Database>) -> anyhow::Result<Self> {
        debug!(
            bind = %config.bind_address(),
            api_prefix = %config.api_prefix,
            db_host = config.database.host.as_deref().unwrap_or_default(),
            metrics = config.enable_metrics,
            "Starting resdash"
        );

        let app_state = AppState::builder().db(db).config(config.clone()).build();
        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            app_state,
            config,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Serve until `shutdown` resolves, then close the database pool and flush telemetry.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "resdash listening on http://{}, API at {}",
            bind_addr,
            if self.config.api_base().is_empty() { "/" } else { self.config.api_base() }
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Closing database connections...");
        self.app_state.db.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
