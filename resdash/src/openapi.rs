//! OpenAPI documentation for the dashboard API.

use utoipa::OpenApi;
use utoipa::openapi::server::Server;

use crate::api::handlers::{connection, links, resources};
use crate::api::models::{connection::ConnectionStatus, links::PortalLinks, resources::Resource};
use crate::errors::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "resdash API",
        description = "Read-only listing of the `resources` table with a database health probe."
    ),
    paths(connection::check_connection, resources::list_users, links::get_links),
    components(schemas(ConnectionStatus, Resource, PortalLinks, ErrorResponse)),
    tags(
        (name = "health", description = "Database connectivity"),
        (name = "resources", description = "Resource listing"),
        (name = "config", description = "Client configuration"),
    )
)]
pub struct ApiDoc;

/// The document with its server URL set to the mount point of the API routes.
pub fn api_doc(api_base: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let base = if api_base.is_empty() { "/" } else { api_base };
    doc.servers = Some(vec![Server::new(base)]);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_every_route() {
        let doc = api_doc("/api");
        for path in ["/check-connection", "/users", "/links"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        assert_eq!(doc.servers.unwrap()[0].url, "/api");
    }
}
