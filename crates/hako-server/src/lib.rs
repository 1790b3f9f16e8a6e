//! HTTP server for hako users and items.
//!
//! The binary in `main.rs` only wires configuration, logging and the
//! listener; the route table lives here so it can be driven in tests.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::Router;
use hako_config::ServerConfig;
use hako_store::{StoreError, UserStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ServerState {
    pub store: UserStore,
}

impl ServerState {
    pub fn new(store: UserStore) -> Self {
        Self { store }
    }

    /// Opens the store described by `config`.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StoreError> {
        let store = if config.is_in_memory() {
            info!("Using in-memory database");
            UserStore::in_memory(config.sql_echo)?
        } else {
            UserStore::open(&config.database_path, config.sql_echo)?
        };
        Ok(Self::new(store))
    }
}

/// Builds the application router.
pub fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let logged_routes = Router::new()
        .route("/users", post(handlers::users::create).get(handlers::users::list))
        .route("/users/", post(handlers::users::create).get(handlers::users::list))
        .route("/users/{user_id}", get(handlers::users::get))
        .route("/users/{user_id}/items", post(handlers::users::create_item))
        .route("/users/{user_id}/items/", post(handlers::users::create_item))
        .route("/items", get(handlers::items::list))
        .route("/items/", get(handlers::items::list))
        .layer(trace_layer);

    Router::new()
        .merge(logged_routes)
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}
