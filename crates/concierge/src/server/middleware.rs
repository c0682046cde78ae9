//! Request context and middleware for the concierge REST API
//!
//! Every request gets a unique id, and its start and completion are written to
//! the shared log buffer with method, path, status and duration.

use axum::{
  extract::{Request, State},
  http::{HeaderValue, Method, Uri},
  middleware::Next,
  response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::logs::{LogBuffer, LogContext, LogLevel};
use crate::server::state::AppContext;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request metadata and logger, available to handlers as an extension
#[derive(Clone)]
pub struct RequestContext {
  /// Unique ID for this request
  pub request_id: Uuid,
  /// HTTP method
  pub method: Method,
  /// Request URI
  pub uri: Uri,
  /// Shared log buffer
  pub logs: LogBuffer,
}

impl RequestContext {
  pub fn new(method: Method, uri: Uri, logs: LogBuffer) -> Self {
    Self { request_id: Uuid::new_v4(), method, uri, logs }
  }

  pub async fn log_info(&self, message: &str, component: &str) {
    self.log(LogLevel::Info, message, component, None, None).await;
  }

  pub async fn log_success(&self, message: &str, component: &str) {
    self.log(LogLevel::Success, message, component, None, None).await;
  }

  pub async fn log_warn(&self, message: &str, component: &str) {
    self.log(LogLevel::Warn, message, component, None, None).await;
  }

  pub async fn log_error(&self, message: &str, component: &str) {
    self.log(LogLevel::Error, message, component, None, None).await;
  }

  /// Log with full request context information
  pub async fn log(
    &self,
    level: LogLevel,
    message: &str,
    component: &str,
    status_code: Option<u16>,
    duration_ms: Option<f64>,
  ) {
    let context = LogContext {
      request_id: Some(self.request_id.to_string()),
      method: Some(self.method.to_string()),
      path: Some(self.uri.path().to_string()),
      status_code,
      duration_ms,
    };
    self.logs.record(level, message, component, Some(context)).await;
  }
}

/// Middleware to inject a RequestContext into every request
pub async fn request_context_middleware(
  State(app): State<Arc<AppContext>>,
  mut request: Request,
  next: Next,
) -> Response {
  let context =
    RequestContext::new(request.method().clone(), request.uri().clone(), app.logs.clone());

  let start_time = Instant::now();
  context.log_info("Request started", "http-request").await;
  request.extensions_mut().insert(context.clone());

  let mut response = next.run(request).await;

  let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
  let status = response.status();
  let level = if status.is_server_error() { LogLevel::Error } else { LogLevel::Info };
  context
    .log(level, "Request completed", "http-request", Some(status.as_u16()), Some(duration_ms))
    .await;

  if let Ok(value) = HeaderValue::from_str(&context.request_id.to_string()) {
    response.headers_mut().insert(REQUEST_ID_HEADER, value);
  }
  response
}
