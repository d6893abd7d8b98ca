use axum::{Json, extract::State};

use crate::AppState;
use crate::api::models::connection::ConnectionStatus;
use crate::errors::{Error, Result};

/// Probe the database: check out one connection, ping it, and hand it back.
#[utoipa::path(
    get,
    path = "/check-connection",
    tag = "health",
    summary = "Check database connection",
    description = "Acquire a pooled connection and ping it. Driver details are logged, never returned.",
    responses(
        (status = 200, description = "Database reachable", body = ConnectionStatus,
            example = json!({"connected": true})),
        (status = 500, description = "Database unreachable", body = ConnectionStatus,
            example = json!({"connected": false, "error": "Database connection failed"})),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn check_connection(State(state): State<AppState>) -> Result<Json<ConnectionStatus>> {
    state
        .db
        .check_connection()
        .await
        .map_err(|source| Error::ConnectionFailed { source })?;

    Ok(Json(ConnectionStatus::connected()))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{FakeBehaviour, FakePoolFactory, create_test_app};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_connected() {
        let factory = FakePoolFactory::default();
        let server = create_test_app(factory.clone());

        let response = server.get("/api/check-connection").await;

        response.assert_status_ok();
        response.assert_json(&json!({"connected": true}));
        assert_eq!(factory.stats().acquired(), 1);
        assert_eq!(factory.stats().released(), 1);
    }

    #[tokio::test]
    async fn test_ping_failure_is_generic_500() {
        let factory = FakePoolFactory::default();
        factory.set_behaviour(FakeBehaviour::FailPing);
        let server = create_test_app(factory.clone());

        let response = server.get("/api/check-connection").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({"connected": false, "error": "Database connection failed"}));
        // Connection still handed back after the failed ping
        assert_eq!(factory.stats().released(), factory.stats().acquired());
    }

    #[tokio::test]
    async fn test_construction_failure_is_generic_500() {
        let factory = FakePoolFactory::default();
        factory.set_behaviour(FakeBehaviour::FailConstruction);
        let server = create_test_app(factory.clone());

        let response = server.get("/api/check-connection").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({"connected": false, "error": "Database connection failed"}));
        assert_eq!(factory.stats().pools_created(), 0);
    }

    #[tokio::test]
    async fn test_acquire_timeout_is_generic_500() {
        let factory = FakePoolFactory::default();
        factory.set_behaviour(FakeBehaviour::FailAcquire);
        let server = create_test_app(factory.clone());

        server
            .get("/api/check-connection")
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(factory.stats().acquired(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_recovers_after_pool_fault() {
        let factory = FakePoolFactory::default();
        let server = create_test_app(factory.clone());

        server.get("/api/check-connection").await.assert_status_ok();

        factory.set_behaviour(FakeBehaviour::FailPing);
        server
            .get("/api/check-connection")
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        factory.set_behaviour(FakeBehaviour::Healthy);
        server.get("/api/check-connection").await.assert_status_ok();

        // The broken pool was discarded and a fresh one built
        assert_eq!(factory.stats().pools_created(), 2);
    }
}
