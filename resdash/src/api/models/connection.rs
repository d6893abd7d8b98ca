//! Health check response model.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `GET /check-connection`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConnectionStatus {
    pub connected: bool,
    /// Generic failure description; never the driver's own message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub fn connected() -> Self {
        Self {
            connected: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            connected: false,
            error: Some(message.into()),
        }
    }
}
