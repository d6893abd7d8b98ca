//! Request/response data structures shared by the server and the client.

pub mod connection;
pub mod links;
pub mod resources;
