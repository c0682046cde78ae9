//! Axum router configuration for all endpoints

use axum::{middleware::from_fn_with_state, routing::get, Router};
use std::sync::Arc;

use crate::server::handlers::{analytics, ask, logs, status};
use crate::server::middleware::request_context_middleware;
use crate::server::state::AppContext;

/// Create the application router with shared state
pub fn create_router(app: Arc<AppContext>) -> Router {
  Router::new()
    // Question answering
    .route("/ask", get(ask::ask_get).post(ask::ask_post))
    // Revenue analytics
    .route("/analytics", get(analytics::analytics))
    .route("/analytics/plot", get(analytics::revenue_plot))
    // Status and version endpoints
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    .route("/api", get(status::api_info))
    // Logs endpoint
    .route("/logs", get(logs::get_logs))
    .layer(from_fn_with_state(app.clone(), request_context_middleware))
    .with_state(app)
}
