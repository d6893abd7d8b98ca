//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures, shared with [`crate::client`]
//!
//! # API Structure
//!
//! Everything below is mounted under the configured `api_prefix` (default `/api`):
//!
//! - `GET /check-connection`: database health probe
//! - `GET /users`: every row of the `resources` table
//! - `GET /links`: portal deep links for the dashboard
//!
//! The OpenAPI document is served at `/api-docs/openapi.json`, with a browsable
//! reference at `/docs`.

pub mod handlers;
pub mod models;
