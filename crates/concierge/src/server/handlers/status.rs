//! Status, version and API description handlers

use axum::{extract::State, response::Json};
use schemars::{schema::RootSchema, schema_for};
use std::sync::Arc;
use uuid::Uuid;

use crate::server::models::insights::Insights;
use crate::server::state::AppContext;
use crate::server::types::{
  ApiInfoResponse, ApiVersions, AskRequest, AskResponse, BaseResponse, EndpointInfo, LogsResponse,
  StatusResponse, VersionResponse,
};

/// Routes served by this version, in the order they are registered
pub const ENDPOINTS: [(&str, &str, &str); 8] = [
  ("POST", "/ask", "Answer a question sent as JSON"),
  ("GET", "/ask", "Answer a question sent as ?question="),
  ("GET", "/analytics", "Precomputed monthly revenue"),
  ("GET", "/analytics/plot", "Monthly revenue chart as PNG"),
  ("GET", "/status", "Health and loaded data sizes"),
  ("GET", "/version", "Server version"),
  ("GET", "/api", "Endpoints and body schemas"),
  ("GET", "/logs", "Recent structured log entries (?limit=&level=)"),
];

/// GET /status - Health check endpoint
pub async fn status(State(app): State<Arc<AppContext>>) -> Json<BaseResponse<StatusResponse>> {
  let response = StatusResponse {
    status: "healthy".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    records: app.dataset.len(),
    index_entries: app.index.len(),
    index_dimension: app.index.dimension(),
    insight_months: app.insights.revenue_trend.len(),
  };

  Json(BaseResponse::success(response, Uuid::new_v4()))
}

/// GET /version - Returns current API version
pub async fn version() -> Json<BaseResponse<VersionResponse>> {
  let response = VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() };
  Json(BaseResponse::success(response, Uuid::new_v4()))
}

/// GET /api - Returns API information, routes and body schemas
pub async fn api_info() -> Json<BaseResponse<ApiInfoResponse>> {
  let version = env!("CARGO_PKG_VERSION");

  let endpoints = ENDPOINTS
    .iter()
    .map(|(method, path, description)| EndpointInfo {
      method: method.to_string(),
      path: path.to_string(),
      description: description.to_string(),
    })
    .collect();

  let mut schemas = serde_json::Map::new();
  let named: [(&str, RootSchema); 5] = [
    ("AskRequest", schema_for!(AskRequest)),
    ("AskResponse", schema_for!(AskResponse)),
    ("Insights", schema_for!(Insights)),
    ("StatusResponse", schema_for!(StatusResponse)),
    ("LogsResponse", schema_for!(LogsResponse)),
  ];
  for (name, schema) in named {
    match serde_json::to_value(&schema) {
      Ok(value) => {
        schemas.insert(name.to_string(), value);
      }
      Err(e) => tracing::warn!(schema = name, error = %e, "failed to serialize schema"),
    }
  }

  let response = ApiInfoResponse {
    latest: version.to_string(),
    versions: ApiVersions { latest: version.to_string(), active: vec![version.to_string()] },
    endpoints,
    schemas,
  };

  Json(BaseResponse::success(response, Uuid::new_v4()))
}
