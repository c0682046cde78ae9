//! Question routing: ordered pattern rules, then retrieval + generation
//!
//! Questions are lower-cased once and handed to each rule in turn. The first
//! rule that answers wins. When none applies the retrieval fallback runs, and
//! any failure there is reported inside the response rather than returned.

pub mod fallback;
pub mod rules;

pub use fallback::{build_prompt, RetrievalFallback};
pub use rules::{default_rules, QueryRule};

use anyhow::Result;

use crate::server::models::booking::Dataset;
use crate::server::models::insights::Insights;
use crate::server::services::vector_index::FlatIndex;
use crate::server::types::AskResponse;

/// Response text for any fallback failure
pub const APOLOGY: &str = "Sorry, I couldn't process your question at the moment.";

/// Read-only data the rules and fallback answer from
#[derive(Clone, Copy)]
pub struct QueryContext<'a> {
  pub dataset: &'a Dataset,
  pub insights: &'a Insights,
  pub index: &'a FlatIndex,
}

/// Ordered rule list plus the retrieval fallback
pub struct QueryRouter {
  rules: Vec<Box<dyn QueryRule>>,
  fallback: RetrievalFallback,
}

impl QueryRouter {
  pub fn new(rules: Vec<Box<dyn QueryRule>>, fallback: RetrievalFallback) -> Self {
    Self { rules, fallback }
  }

  /// Router with the revenue, cancellation and average-price rules
  pub fn with_default_rules(fallback: RetrievalFallback) -> Result<Self> {
    Ok(Self::new(default_rules()?, fallback))
  }

  pub fn normalize(question: &str) -> String {
    question.to_lowercase()
  }

  /// First rule answer for an already normalised question
  pub fn match_rules(&self, question: &str, context: &QueryContext<'_>) -> Option<AskResponse> {
    self.rules.iter().find_map(|rule| {
      let answer = rule.answer(question, context)?;
      tracing::debug!(rule = rule.name(), "question answered by rule");
      Some(AskResponse::answer(answer))
    })
  }

  /// Run the fallback for an already normalised question
  pub fn fallback(&self, question: &str, context: &QueryContext<'_>) -> AskResponse {
    self.fallback.answer(question, context)
  }

  /// Answer a raw question synchronously
  pub fn route(&self, question: &str, context: &QueryContext<'_>) -> AskResponse {
    let question = Self::normalize(question);
    self.match_rules(&question, context).unwrap_or_else(|| self.fallback(&question, context))
  }
}
