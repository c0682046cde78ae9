//! Question endpoint handlers

use axum::{
  extract::{Extension, Query, State},
  response::Json,
};
use std::sync::Arc;

use crate::server::{
  middleware::RequestContext,
  state::AppContext,
  types::{AskQuery, AskRequest, AskResponse},
};

/// POST /ask - Answer a question sent as JSON
pub async fn ask_post(
  State(app): State<Arc<AppContext>>,
  Extension(context): Extension<RequestContext>,
  Json(request): Json<AskRequest>,
) -> Json<AskResponse> {
  Json(answer(&app, &context, &request.question).await)
}

/// GET /ask?question=... - Answer a question sent in the query string
pub async fn ask_get(
  State(app): State<Arc<AppContext>>,
  Extension(context): Extension<RequestContext>,
  Query(query): Query<AskQuery>,
) -> Json<AskResponse> {
  Json(answer(&app, &context, &query.question).await)
}

async fn answer(app: &Arc<AppContext>, context: &RequestContext, question: &str) -> AskResponse {
  context.log_info(&format!("Question received ({} chars)", question.len()), "ask-api").await;

  let response = app.ask(question).await;
  match &response.error {
    Some(error) => context.log_warn(&format!("Question not answered: {error}"), "ask-api").await,
    None => context.log_success("Question answered", "ask-api").await,
  }
  response
}
