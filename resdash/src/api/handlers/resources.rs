use axum::{Json, extract::State};
use tracing::info;

use crate::AppState;
use crate::api::models::resources::Resource;
use crate::errors::{Error, ErrorResponse, Result};

/// List every row of the `resources` table, unfiltered and unpaginated.
#[utoipa::path(
    get,
    path = "/users",
    tag = "resources",
    summary = "List resources",
    description = "Run `SELECT * FROM resources` and return every row as a JSON object keyed by column name.",
    responses(
        (status = 200, description = "All rows, in database order", body = [Resource]),
        (status = 500, description = "Query failed", body = ErrorResponse,
            example = json!({"error": "Failed to retrieve users"})),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<Resource>>> {
    let rows = state
        .db
        .list_resources()
        .await
        .map_err(|source| Error::RetrieveFailed { source })?;

    info!("Retrieved {} rows from resources", rows.len());
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use crate::db::pool::LIST_RESOURCES_SQL;
    use crate::test_utils::{FakeBehaviour, FakePoolFactory, create_test_app};
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_returns_every_row_in_order() {
        let factory = FakePoolFactory::with_rows(vec![
            json!({"Name": "Alice", "Resource_Group": "rg-alice", "Location": "westeurope"}),
            json!({"Name": "bob", "Resource_Group": null}),
            json!({"Name": "Alice", "Subscription": "sub-2"}),
        ]);
        let server = create_test_app(factory.clone());

        let response = server.get("/api/users").await;

        response.assert_status_ok();
        let rows: Vec<Value> = response.json();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["Name"], "Alice");
        assert_eq!(rows[1]["Resource_Group"], Value::Null);
        assert_eq!(rows[2]["Subscription"], "sub-2");
        assert_eq!(factory.stats().queries(), vec![LIST_RESOURCES_SQL.to_string()]);
    }

    #[tokio::test]
    async fn test_column_order_preserved() {
        let factory = FakePoolFactory::with_rows(vec![json!({"Name": "Alice", "Location": "x", "Id": 1})]);
        let server = create_test_app(factory);

        let text = server.get("/api/users").await.text();
        assert_eq!(text, r#"[{"Name":"Alice","Location":"x","Id":1}]"#);
    }

    #[tokio::test]
    async fn test_empty_table() {
        let server = create_test_app(FakePoolFactory::default());

        let response = server.get("/api/users").await;

        response.assert_status_ok();
        response.assert_json(&json!([]));
    }

    #[test_log::test(tokio::test)]
    async fn test_query_failure_is_generic_500() {
        let factory = FakePoolFactory::default();
        factory.set_behaviour(FakeBehaviour::FailQuery);
        let server = create_test_app(factory.clone());

        let response = server.get("/api/users").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({"error": "Failed to retrieve users"}));
        // A statement error leaves the pool in place
        assert_eq!(factory.stats().pools_created(), 1);
    }

    #[tokio::test]
    async fn test_construction_failure_is_generic_500() {
        let factory = FakePoolFactory::default();
        factory.set_behaviour(FakeBehaviour::FailConstruction);
        let server = create_test_app(factory);

        let response = server.get("/api/users").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({"error": "Failed to retrieve users"}));
    }
}
