//! SCIM 2.0 user provisioning and query engine.
//!
//! Identity providers create, read, replace and delete users through the
//! `/scim/v2/Users` endpoints. List requests accept the SCIM filter language
//! and `startIndex`/`count` pagination.

pub mod config;
pub mod db;
pub mod models;
#[cfg(feature = "server")]
pub mod observability;
pub mod routes;
pub mod scim;
pub mod services;

use std::sync::Arc;

use axum::Router;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::ScimGateConfig>,
    /// Provisioning service backing the Users endpoints.
    pub scim_users: services::ScimUserHandler,
}

impl AppState {
    pub fn new(config: config::ScimGateConfig, store: Arc<dyn db::UserStore>) -> Self {
        let scim_users = services::ScimUserHandler::new(store, config.scim.clone());
        Self {
            config: Arc::new(config),
            scim_users,
        }
    }
}

/// Build the application router with tracing and body-limit layers.
pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    Router::new()
        .nest("/scim", routes::scim_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
