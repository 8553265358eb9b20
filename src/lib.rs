pub mod admission;
pub mod bandwidth;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod forwarder;
pub mod handlers;
pub mod identity;
pub mod metrics;
pub mod models;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

// Route table, shared by main and the integration tests.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handlers::chat_handler))
        .route("/chat/completions", post(handlers::chat_handler))
        .route("/health", get(handlers::health_handler))
        .route("/healthz", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(state)
}
