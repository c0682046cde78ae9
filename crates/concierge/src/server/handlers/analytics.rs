//! Revenue analytics endpoint handlers

use axum::{
  extract::{Extension, State},
  http::{header, StatusCode},
  response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use crate::server::{
  middleware::RequestContext,
  models::insights::Insights,
  services::chart::render_revenue_chart,
  state::AppContext,
  types::{ApiError, BaseResponse},
};

pub const PLOT_CONTENT_DISPOSITION: &str = "inline; filename=\"revenue_trends.png\"";

/// GET /analytics - The precomputed insights, verbatim
pub async fn analytics(State(app): State<Arc<AppContext>>) -> Json<Insights> {
  Json(app.insights.clone())
}

/// GET /analytics/plot - Monthly revenue chart rendered from the live dataset
pub async fn revenue_plot(
  State(app): State<Arc<AppContext>>,
  Extension(context): Extension<RequestContext>,
) -> Response {
  let series = app.dataset.monthly_revenue();

  match render_revenue_chart(&series) {
    Ok(png) => {
      let message = format!("Rendered revenue chart for {} months", series.len());
      context.log_success(&message, "analytics-api").await;
      let headers = [
        (header::CONTENT_TYPE, "image/png"),
        (header::CONTENT_DISPOSITION, PLOT_CONTENT_DISPOSITION),
      ];
      (headers, png).into_response()
    }
    Err(e) => {
      context.log_error(&format!("Failed to render revenue chart: {e}"), "analytics-api").await;
      let error = ApiError::from_anyhow("plot_render_failed", &e);
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(BaseResponse::<()>::error(vec![error], context.request_id)),
      )
        .into_response()
    }
  }
}
