//! Logs endpoint handler

use axum::{
  extract::{Extension, Query, State},
  http::StatusCode,
  response::Json,
};
use std::sync::Arc;

use crate::logs::LogLevel;
use crate::server::{
  middleware::RequestContext,
  state::AppContext,
  types::{ApiError, BaseResponse, LogsQuery, LogsResponse},
};

const DEFAULT_LIMIT: usize = 100;

/// GET /logs - Recent log entries, newest first
pub async fn get_logs(
  State(app): State<Arc<AppContext>>,
  Extension(context): Extension<RequestContext>,
  Query(query): Query<LogsQuery>,
) -> Result<Json<BaseResponse<LogsResponse>>, (StatusCode, Json<BaseResponse<()>>)> {
  let level = match query.level.as_deref() {
    None | Some("all") | Some("") => None,
    Some(value) => match LogLevel::parse_filter(value) {
      Some(level) => Some(level),
      None => {
        let error = ApiError::new(
          "invalid_log_level",
          &format!("Unknown log level '{value}' (expected info, success, warn, error or all)"),
        );
        return Err((
          StatusCode::BAD_REQUEST,
          Json(BaseResponse::<()>::error(vec![error], context.request_id)),
        ));
      }
    },
  };

  let logs = app.logs.recent(Some(query.limit.unwrap_or(DEFAULT_LIMIT)), level).await;
  Ok(Json(BaseResponse::success(LogsResponse { logs }, context.request_id)))
}
