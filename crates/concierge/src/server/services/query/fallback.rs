//! Retrieval-augmented generation for questions no rule recognises

use anyhow::{anyhow, Result};
use std::sync::Arc;

use super::QueryContext;
use crate::server::services::embeddings::{encode_one, TextEncoder};
use crate::server::services::generation::{GenerationOptions, TextGenerator};
use crate::server::types::AskResponse;

/// Finds the closest booking to the question and lets the generator answer
pub struct RetrievalFallback {
  encoder: Arc<dyn TextEncoder>,
  generator: Arc<dyn TextGenerator>,
  options: GenerationOptions,
}

impl RetrievalFallback {
  pub fn new(
    encoder: Arc<dyn TextEncoder>,
    generator: Arc<dyn TextGenerator>,
    options: GenerationOptions,
  ) -> Self {
    Self { encoder, generator, options }
  }

  /// Answer the question; failures become an apology carrying the error text
  pub fn answer(&self, question: &str, context: &QueryContext<'_>) -> AskResponse {
    match self.generate_answer(question, context) {
      Ok(text) => AskResponse::answer(text),
      Err(e) => {
        tracing::warn!(error = %e, "fallback answer failed");
        AskResponse::failure(e.to_string())
      }
    }
  }

  fn generate_answer(&self, question: &str, context: &QueryContext<'_>) -> Result<String> {
    let query = encode_one(self.encoder.as_ref(), question)?;
    let nearest = context
      .index
      .search(&query, 1)?
      .into_iter()
      .next()
      .ok_or_else(|| anyhow!("The booking index is empty"))?;

    let record = context
      .dataset
      .get(nearest.record_id)
      .ok_or_else(|| anyhow!("Index refers to unknown booking record {}", nearest.record_id))?;

    let prompt = build_prompt(question, &context.dataset.describe(record));
    tracing::debug!(record = %nearest.record_id, distance = nearest.distance, "retrieved context");

    let generated = self.generator.generate(&prompt, &self.options)?;
    if generated.trim().is_empty() {
      return Err(anyhow!("The language model returned an empty response"));
    }
    Ok(generated)
  }
}

/// Generator input combining the question and the retrieved record
pub fn build_prompt(question: &str, record_description: &str) -> String {
  format!("User asked: '{question}'. Closest booking record: {record_description}")
}
