use axum::{Json, extract::State};

use crate::AppState;
use crate::api::models::links::PortalLinks;

/// Portal deep links configured for this deployment.
#[utoipa::path(
    get,
    path = "/links",
    tag = "config",
    summary = "Get portal links",
    responses(
        (status = 200, description = "Configured links", body = PortalLinks),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_links(State(state): State<AppState>) -> Json<PortalLinks> {
    Json(state.config.portal.clone())
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{FakePoolFactory, create_test_app_with_config, create_test_config};
    use serde_json::json;
    use url::Url;

    #[tokio::test]
    async fn test_serves_configured_links_without_database() {
        let mut config = create_test_config();
        config
            .portal
            .links
            .insert("Agu".to_string(), Url::parse("https://portal.example.com/rg/agu").unwrap());
        config.portal.featured = Some("Agu".to_string());

        let factory = FakePoolFactory::default();
        let server = create_test_app_with_config(factory.clone(), config);

        let response = server.get("/api/links").await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "links": {"Agu": "https://portal.example.com/rg/agu"},
            "featured": "Agu"
        }));
        assert_eq!(factory.stats().pools_created(), 0);
    }
}
