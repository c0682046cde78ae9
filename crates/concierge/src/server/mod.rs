//! REST API for the concierge service
//!
//! Provides the question, analytics and service endpoints. Uses axum for
//! routing and schemars for describing request and response bodies.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routing;
pub mod services;
pub mod startup;
pub mod state;
pub mod types;
