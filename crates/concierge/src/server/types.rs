//! REST API types with schemars annotations for schema publishing

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::logs::{LogContext, LogEntry};
use crate::server::services::query::APOLOGY;

// Base Response Structure
// ======================

/// Envelope for the service endpoints (status, version, api, logs, errors)
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BaseResponse<T> {
  /// API versioning information
  pub versioning: VersionInfo,

  /// Transaction ID for logging correlation
  pub transaction_id: Uuid,

  /// Optional error information
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub errors: Vec<ApiError>,

  /// Response data (generic for different endpoint types)
  #[serde(flatten)]
  pub data: T,
}

/// API versioning information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionInfo {
  /// The latest version of the API
  pub latest: String,

  /// The version of the API requested by the client
  pub requested: String,

  /// The version of the API that was used in producing the response
  pub resolved: String,
}

/// API error information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiError {
  /// Error key, unique to the error source
  pub key: String,

  /// Human readable error message
  pub message: String,

  /// Error cause chain (if available)
  #[serde(default)]
  pub stack: Vec<String>,

  /// Additional error context
  #[serde(default)]
  pub context: serde_json::Value,
}

// Question Endpoint
// =================

/// Body of `POST /ask`
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct AskRequest {
  /// Free-text question; missing means empty
  #[serde(default)]
  pub question: String,
}

/// Query string of `GET /ask`
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct AskQuery {
  #[serde(default)]
  pub question: String,
}

/// Answer to a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AskResponse {
  /// Answer text, or an apology when the question could not be processed
  pub response: String,

  /// Diagnostic text, present only on failure
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub error: Option<String>,
}

impl AskResponse {
  pub fn answer(text: impl Into<String>) -> Self {
    Self { response: text.into(), error: None }
  }

  /// Apology carrying the error that prevented an answer
  pub fn failure(error: impl Into<String>) -> Self {
    Self { response: APOLOGY.to_string(), error: Some(error.into()) }
  }
}

// Status/Version Endpoints
// =======================

/// Response for /status endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
  /// Overall service health
  pub status: String,

  /// Server version
  pub version: String,

  /// Booking records loaded from the dataset
  pub records: usize,

  /// Entries in the vector index
  pub index_entries: usize,

  /// Embedding dimension of the vector index
  pub index_dimension: usize,

  /// Months covered by the precomputed insights
  pub insight_months: usize,
}

/// Response for /version endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  /// Current API version
  pub version: String,
}

/// Response for /api endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiInfoResponse {
  /// Latest API version
  pub latest: String,

  /// Version information
  pub versions: ApiVersions,

  /// Routes served by this version
  pub endpoints: Vec<EndpointInfo>,

  /// JSON schemas of the request and response bodies, keyed by type name
  pub schemas: serde_json::Map<String, serde_json::Value>,
}

/// API version details
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiVersions {
  /// Latest version
  pub latest: String,

  /// Currently active versions
  pub active: Vec<String>,
}

/// A single route
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EndpointInfo {
  pub method: String,
  pub path: String,
  pub description: String,
}

// Logs Endpoint
// =============

/// Query string of `GET /logs`
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct LogsQuery {
  /// Maximum number of entries, newest first
  pub limit: Option<usize>,

  /// Level filter (info, success, warn, error, all)
  pub level: Option<String>,
}

/// Response for /logs endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LogsResponse {
  /// JSON log entries
  pub logs: Vec<LogEntry>,
}

// Helper Functions
// ================

fn version_info() -> VersionInfo {
  let version = env!("CARGO_PKG_VERSION");
  VersionInfo {
    latest: version.to_string(),
    requested: version.to_string(),
    resolved: version.to_string(),
  }
}

impl<T> BaseResponse<T> {
  /// Create a successful response
  pub fn success(data: T, transaction_id: Uuid) -> Self {
    Self { versioning: version_info(), transaction_id, errors: Vec::new(), data }
  }

  /// Create an error response
  pub fn error(errors: Vec<ApiError>, transaction_id: Uuid) -> BaseResponse<()> {
    BaseResponse { versioning: version_info(), transaction_id, errors, data: () }
  }
}

impl ApiError {
  /// Create a new API error
  pub fn new(key: &str, message: &str) -> Self {
    Self {
      key: key.to_string(),
      message: message.to_string(),
      stack: Vec::new(),
      context: serde_json::Value::Null,
    }
  }

  /// Error whose stack lists the anyhow cause chain
  pub fn from_anyhow(key: &str, error: &anyhow::Error) -> Self {
    let mut api_error = Self::new(key, &error.to_string());
    api_error.stack = error.chain().skip(1).map(|cause| cause.to_string()).collect();
    api_error
  }
}
