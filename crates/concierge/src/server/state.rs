//! Shared application context built once at startup
//!
//! Everything here is read-only after construction. Handlers receive it as
//! `Arc<AppContext>` axum state.

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::logs::LogBuffer;
use crate::server::models::booking::Dataset;
use crate::server::models::insights::Insights;
use crate::server::services::embeddings::TextEncoder;
use crate::server::services::generation::{GenerationOptions, TextGenerator};
use crate::server::services::query::{QueryContext, QueryRouter, RetrievalFallback};
use crate::server::services::vector_index::FlatIndex;
use crate::server::types::AskResponse;

pub struct AppContext {
  pub config: Config,
  pub dataset: Dataset,
  pub index: FlatIndex,
  pub insights: Insights,
  pub router: QueryRouter,
  pub logs: LogBuffer,
}

impl AppContext {
  /// Assemble a context from already loaded parts
  pub fn new(
    config: Config,
    dataset: Dataset,
    index: FlatIndex,
    insights: Insights,
    encoder: Arc<dyn TextEncoder>,
    generator: Arc<dyn TextGenerator>,
  ) -> Result<Self> {
    let options = GenerationOptions::from(&config.generation);
    let fallback = RetrievalFallback::new(encoder, generator, options);
    let router = QueryRouter::with_default_rules(fallback)?;
    let logs = LogBuffer::new(config.server.log_capacity);

    Ok(Self { config, dataset, index, insights, router, logs })
  }

  /// Load the dataset, index, insights and models named by `config`
  ///
  /// Any failure here is fatal for the server.
  pub fn load(config: Config) -> Result<Self> {
    let dataset = Dataset::load(&config.data.dataset)
      .with_context(|| format!("Failed to load dataset {}", config.data.dataset.display()))?;
    tracing::info!(records = dataset.len(), "dataset loaded");

    let index = FlatIndex::load(&config.data.index).with_context(|| {
      format!(
        "Failed to load vector index {} (run `concierge index` first)",
        config.data.index.display()
      )
    })?;
    let fingerprint = dataset.fingerprint();
    if index.fingerprint() != &fingerprint {
      return Err(anyhow!(
        "Vector index {} was built from a different version of the dataset \
         (index {}, dataset {}); rebuild it with `concierge index`",
        config.data.index.display(),
        index.fingerprint(),
        fingerprint
      ));
    }

    let insights = Insights::load(&config.data.insights).with_context(|| {
      format!(
        "Failed to load insights {} (run `concierge analyze` first)",
        config.data.insights.display()
      )
    })?;

    let (encoder, generator) = load_models(&config)?;
    Self::new(config, dataset, index, insights, encoder, generator)
  }

  pub fn query_context(&self) -> QueryContext<'_> {
    QueryContext { dataset: &self.dataset, insights: &self.insights, index: &self.index }
  }

  /// Route a question; the fallback runs on the blocking pool
  pub async fn ask(self: &Arc<Self>, question: &str) -> AskResponse {
    let question = QueryRouter::normalize(question);
    if let Some(answer) = self.router.match_rules(&question, &self.query_context()) {
      return answer;
    }

    let context = Arc::clone(self);
    let task = tokio::task::spawn_blocking(move || {
      context.router.fallback(&question, &context.query_context())
    });

    match task.await {
      Ok(response) => response,
      Err(e) => {
        tracing::error!(error = %e, "fallback task failed");
        AskResponse::failure(format!("Answer generation task failed: {e}"))
      }
    }
  }
}

fn load_models(config: &Config) -> Result<(Arc<dyn TextEncoder>, Arc<dyn TextGenerator>)> {
  Ok((load_encoder(config)?, load_generator(config)?))
}

/// The sentence encoder named by `config`
#[cfg(feature = "ml-features")]
pub fn load_encoder(config: &Config) -> Result<Arc<dyn TextEncoder>> {
  use crate::server::services::embeddings::OnnxSentenceEncoder;

  let encoder = OnnxSentenceEncoder::load(
    &config.models.encoder_dir,
    config.models.batch_size,
    config.models.max_sequence_length,
  )?;
  Ok(Arc::new(encoder))
}

#[cfg(not(feature = "ml-features"))]
pub fn load_encoder(_config: &Config) -> Result<Arc<dyn TextEncoder>> {
  tracing::warn!("built without ml-features; text encoding is unavailable");
  Ok(Arc::new(crate::server::services::embeddings::UnavailableEncoder))
}

/// The text generator named by `config`
#[cfg(feature = "ml-features")]
pub fn load_generator(config: &Config) -> Result<Arc<dyn TextGenerator>> {
  use crate::server::services::generation::OnnxT5Generator;

  Ok(Arc::new(OnnxT5Generator::load(&config.models.generator_dir)?))
}

#[cfg(not(feature = "ml-features"))]
pub fn load_generator(_config: &Config) -> Result<Arc<dyn TextGenerator>> {
  tracing::warn!("built without ml-features; unmatched questions will not be answered");
  Ok(Arc::new(crate::server::services::generation::UnavailableGenerator))
}
