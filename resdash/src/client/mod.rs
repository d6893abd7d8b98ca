//! HTTP client for the dashboard API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::api::models::connection::ConnectionStatus;
use crate::api::models::links::PortalLinks;
use crate::api::models::resources::Resource;
use crate::ui::driver::Backend;
use crate::ui::state::Failure;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request never got a response (connection refused, timeout, bad body)
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("API returned {status}: {}", .message.as_deref().unwrap_or("no error message"))]
    Status { status: StatusCode, message: Option<String> },
}

impl ClientError {
    /// The `error` field of the server's response body, if there was one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Status { message, .. } => message.as_deref(),
            ClientError::InvalidUrl(_) | ClientError::Request(_) => None,
        }
    }
}

impl From<ClientError> for Failure {
    fn from(err: ClientError) -> Self {
        Failure::new(err.server_message().map(str::to_string), err.to_string())
    }
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Talks to a running `resdash` server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// `base_url` is where the API routes are mounted, e.g. `http://localhost:3001/api`.
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(Self::DEFAULT_REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: ensure_slash(&base_url),
        })
    }

    #[instrument(skip(self), err)]
    pub async fn check_connection(&self) -> Result<ConnectionStatus, ClientError> {
        self.get("check-connection").await
    }

    #[instrument(skip(self), err)]
    pub async fn list_resources(&self) -> Result<Vec<Resource>, ClientError> {
        let rows: Vec<Resource> = self.get("users").await?;
        debug!("Fetched {} records", rows.len());
        Ok(rows)
    }

    #[instrument(skip(self), err)]
    pub async fn portal_links(&self) -> Result<PortalLinks, ClientError> {
        self.get("links").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            // The body is only informative; a missing or non-JSON body still yields the status
            let message = response.json::<ErrorBody>().await.ok().and_then(|body| body.error);
            return Err(ClientError::Status { status, message });
        }

        Ok(response.json::<T>().await?)
    }
}

/// Makes sure a url has a trailing slash, so `join` appends instead of replacing the
/// last path segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let path = format!("{}/", new_url.path());
        new_url.set_path(&path);
        new_url
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn check_connection(&self) -> Result<ConnectionStatus, Failure> {
        ApiClient::check_connection(self).await.map_err(Failure::from)
    }

    async fn list_resources(&self) -> Result<Vec<Resource>, Failure> {
        ApiClient::list_resources(self).await.map_err(Failure::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(Url::parse(&format!("{}/api", server.uri())).unwrap()).unwrap()
    }

    #[test]
    fn test_ensure_slash() {
        let url = Url::parse("http://localhost:3001/api").unwrap();
        assert_eq!(ensure_slash(&url).join("users").unwrap().as_str(), "http://localhost:3001/api/users");

        let url = Url::parse("http://localhost:3001/").unwrap();
        assert_eq!(ensure_slash(&url).join("users").unwrap().as_str(), "http://localhost:3001/users");
    }

    #[tokio::test]
    async fn test_check_connection_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/check-connection"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"connected": true})))
            .expect(1)
            .mount(&server)
            .await;

        let status = client_for(&server).await.check_connection().await.unwrap();
        assert!(status.connected);
    }

    #[tokio::test]
    async fn test_server_error_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/check-connection"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"connected": false, "error": "Database connection failed"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).await.check_connection().await.unwrap_err();

        assert!(matches!(err, ClientError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.server_message(), Some("Database connection failed"));

        let failure = Failure::from(err);
        assert_eq!(failure.server_message.as_deref(), Some("Database connection failed"));
    }

    #[tokio::test]
    async fn test_error_without_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.list_resources().await.unwrap_err();
        assert_eq!(err.server_message(), None);
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn test_list_resources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"Name": "Agu", "Location": "westeurope"},
                {"Name": "Elis"}
            ])))
            .mount(&server)
            .await;

        let rows = client_for(&server).await.list_resources().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].location().as_deref(), Some("westeurope"));
    }

    #[tokio::test]
    async fn test_portal_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/links"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "links": {"Agu": "https://portal.example.com/rg/agu"},
                "featured": "Agu"
            })))
            .mount(&server)
            .await;

        let links = client_for(&server).await.portal_links().await.unwrap();
        assert_eq!(links.featured_link().map(|(name, _)| name), Some("Agu"));
    }
}
