//! HTTP route handlers for the hako server.

pub mod items;
pub mod users;

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}
