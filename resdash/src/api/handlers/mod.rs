//! HTTP request handlers.
//!
//! - [`connection`]: database health probe
//! - [`resources`]: the `resources` table listing
//! - [`links`]: portal link configuration
//!
//! Handlers return [`crate::errors::Error`], which logs the underlying cause and
//! answers with a generic JSON body.

pub mod connection;
pub mod links;
pub mod resources;
