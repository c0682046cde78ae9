//! CLI command implementations
//!
//! `index` and `analyze` are offline jobs that read the bookings file
//! directly. The remaining commands are thin clients of a running server.

use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};

use crate::cli::client::get_client;
use crate::cli::display::{display_answer, display_log_entry, display_revenue, display_status};
use crate::config::Config;
use crate::server::models::booking::Dataset;
use crate::server::models::insights::Insights;
use crate::server::services::chart::save_revenue_chart;
use crate::server::services::indexer::build_and_save_index;
use crate::server::state::load_encoder;

/// Configuration with command-line overrides applied
pub fn resolve_config(config_path: Option<&Path>, dataset: Option<PathBuf>) -> Result<Config> {
  let mut config = Config::load(config_path)?;
  if let Some(dataset) = dataset {
    config.data.dataset = dataset;
  }
  Ok(config)
}

fn load_dataset(config: &Config) -> Result<Dataset> {
  let path = &config.data.dataset;
  let dataset =
    Dataset::load(path).with_context(|| format!("Failed to load dataset {}", path.display()))?;
  println!("{} Loaded {} bookings from {}", "✓".green(), dataset.len(), path.display());
  Ok(dataset)
}

/// Encode every booking and write the vector index
pub fn index(config: &Config) -> Result<()> {
  let dataset = load_dataset(config)?;
  let encoder = load_encoder(config)?;

  println!("{} Encoding {} bookings...", "⋯".cyan(), dataset.len());
  let report = build_and_save_index(
    &dataset,
    encoder.as_ref(),
    config.models.batch_size,
    &config.data.index,
  )?;

  println!(
    "{} Indexed {} bookings ({} dimensions) into {}",
    "✓".green(),
    report.records,
    report.dimension,
    config.data.index.display().to_string().cyan()
  );
  Ok(())
}

/// Compute monthly revenue, write the insights file and the chart
pub fn analyze(config: &Config) -> Result<()> {
  let dataset = load_dataset(config)?;
  let insights = Insights::compute(&dataset);

  insights.save(&config.data.insights)?;
  println!(
    "{} Wrote {} months of revenue to {}",
    "✓".green(),
    insights.revenue_trend.len(),
    config.data.insights.display().to_string().cyan()
  );

  save_revenue_chart(&insights.revenue_trend, &config.data.plot)?;
  println!(
    "{} Saved revenue chart to {}",
    "✓".green(),
    config.data.plot.display().to_string().cyan()
  );
  Ok(())
}

pub async fn ask(server: Option<&str>, question: &str) -> Result<()> {
  let client = get_client(server)?;
  let answer = client.ask(question).await?;
  display_answer(&answer);
  Ok(())
}

pub async fn analytics(server: Option<&str>) -> Result<()> {
  let client = get_client(server)?;
  let insights = client.analytics().await?;
  display_revenue(&insights.revenue_trend);
  Ok(())
}

/// Download the revenue chart to `output`
pub async fn plot(server: Option<&str>, output: &Path) -> Result<()> {
  let client = get_client(server)?;
  let png = client.plot().await?;

  if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("Failed to create directory {}", parent.display()))?;
  }
  std::fs::write(output, &png).with_context(|| format!("Failed to write {}", output.display()))?;

  println!(
    "{} Saved revenue chart ({} bytes) to {}",
    "✓".green(),
    png.len(),
    output.display().to_string().cyan()
  );
  Ok(())
}

pub async fn status(server: Option<&str>) -> Result<()> {
  let client = get_client(server)?;
  match client.status().await {
    Ok(response) => {
      display_status(&response.data);
      Ok(())
    }
    Err(e) => {
      println!("{} Concierge server unavailable at {}", "✗".red(), client.base_url());
      Err(e)
    }
  }
}

pub async fn logs(server: Option<&str>, limit: usize, level: &str) -> Result<()> {
  let client = get_client(server)?;
  let response = client.logs(limit, level).await?;

  if response.data.logs.is_empty() {
    println!("No log entries found.");
    return Ok(());
  }

  // Oldest first reads naturally in a terminal
  for entry in response.data.logs.iter().rev() {
    display_log_entry(entry);
  }
  Ok(())
}
