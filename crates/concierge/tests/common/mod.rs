#![allow(dead_code)]

use anyhow::{anyhow, Result};
use std::sync::Arc;

use concierge::config::Config;
use concierge::server::models::booking::Dataset;
use concierge::server::models::insights::Insights;
use concierge::server::services::embeddings::TextEncoder;
use concierge::server::services::generation::{GenerationOptions, TextGenerator};
use concierge::server::services::indexer::build_index;
use concierge::server::services::vector_index::FlatIndex;
use concierge::server::state::AppContext;

pub const BOOKINGS_CSV: &str = "\
hotel,is_canceled,lead_time,adr,country,reservation_status,reservation_status_date
Resort Hotel,0,342,100.0,PRT,Check-Out,2017-03-01
City Hotel,1,737,200.0,PRT,Canceled,2017-03-15
City Hotel,1,7,300.0,GBR,Canceled,2017-04-02
Resort Hotel,1,13,120.0,PRT,Canceled,2017-04-20
City Hotel,1,14,80.0,ESP,No-Show,2017-05-05
Resort Hotel,1,0,90.0,GBR,Canceled,2017-05-09
City Hotel,1,9,110.0,FRA,Canceled,2017-05-30
";

/// Encodes text by counting a few hotel words, so similar records stay close
pub struct KeywordEncoder;

impl TextEncoder for KeywordEncoder {
  fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    Ok(
      texts
        .iter()
        .map(|text| {
          let text = text.to_lowercase();
          vec![
            text.matches("city").count() as f32,
            text.matches("resort").count() as f32,
            text.matches("2017-05").count() as f32,
          ]
        })
        .collect(),
    )
  }

  fn dimension(&self) -> usize {
    3
  }
}

/// Encoder that always fails
pub struct BrokenEncoder;

impl TextEncoder for BrokenEncoder {
  fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
    Err(anyhow!("encoder offline"))
  }

  fn dimension(&self) -> usize {
    3
  }
}

/// Generator that answers with its prompt
pub struct EchoGenerator;

impl TextGenerator for EchoGenerator {
  fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
    Ok(format!("echo: {prompt}"))
  }
}

/// Generator that panics, as a crashed model session would
pub struct PanickingGenerator;

impl TextGenerator for PanickingGenerator {
  fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String> {
    panic!("model session crashed")
  }
}

pub fn dataset() -> Dataset {
  Dataset::from_csv_str(BOOKINGS_CSV).unwrap()
}

pub fn insights() -> Insights {
  let mut insights = Insights::default();
  insights.revenue_trend.insert("2017-03".to_string(), 15230.5);
  insights.revenue_trend.insert("2017-04".to_string(), 420.0);
  insights
}

pub fn context_with(
  encoder: Arc<dyn TextEncoder>,
  generator: Arc<dyn TextGenerator>,
) -> Arc<AppContext> {
  let dataset = dataset();
  let index = build_index(&dataset, &KeywordEncoder, 64).unwrap();
  Arc::new(
    AppContext::new(Config::default(), dataset, index, insights(), encoder, generator).unwrap(),
  )
}

pub fn context() -> Arc<AppContext> {
  context_with(Arc::new(KeywordEncoder), Arc::new(EchoGenerator))
}

pub fn empty_index_context() -> Arc<AppContext> {
  Arc::new(
    AppContext::new(
      Config::default(),
      dataset(),
      FlatIndex::new(3).unwrap(),
      insights(),
      Arc::new(KeywordEncoder),
      Arc::new(EchoGenerator),
    )
    .unwrap(),
  )
}
