use crate::api::models::connection::ConnectionStatus;
use crate::db::errors::DbError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

/// Generic failure message for the health endpoint.
pub const CONNECTION_FAILED_MESSAGE: &str = "Database connection failed";
/// Generic failure message for the list endpoint.
pub const RETRIEVE_FAILED_MESSAGE: &str = "Failed to retrieve users";

#[derive(ThisError, Debug)]
pub enum Error {
    /// The health probe could not get a working connection
    #[error("Database connection failed: {source}")]
    ConnectionFailed {
        #[source]
        source: DbError,
    },

    /// The listing query failed
    #[error("Failed to retrieve users: {source}")]
    RetrieveFailed {
        #[source]
        source: DbError,
    },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Error body returned by every endpoint except the health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::ConnectionFailed { .. } | Error::RetrieveFailed { .. } | Error::Internal { .. } | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to callers. Driver and configuration details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Error::ConnectionFailed { .. } => CONNECTION_FAILED_MESSAGE.to_string(),
            Error::RetrieveFailed { .. } => RETRIEVE_FAILED_MESSAGE.to_string(),
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::ConnectionFailed { source } | Error::RetrieveFailed { source } if matches!(source, DbError::QueueFull { .. }) => {
                tracing::warn!("Database saturated: {:#}", self);
            }
            _ => {
                tracing::error!("Internal service error: {:#}", self);
            }
        }

        let status = self.status_code();
        match &self {
            Error::ConnectionFailed { .. } => (status, Json(ConnectionStatus::failed(self.user_message()))).into_response(),
            _ => (
                status,
                Json(ErrorResponse {
                    error: self.user_message(),
                }),
            )
                .into_response(),
        }
    }
}

/// Type alias for handler results
pub type Result<T> = std::result::Result<T, Error>;
