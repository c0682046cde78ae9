//! Configuration management for Concierge
//!
//! Resolves data, model, generation and server settings from a YAML file,
//! falling back to defaults for anything the file leaves out.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable pointing at a configuration file
pub const CONFIG_ENV_VAR: &str = "CONCIERGE_CONFIG";

/// Configuration file looked up in the working directory
const LOCAL_CONFIG_FILE: &str = "concierge.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub data: DataConfig,
  #[serde(default)]
  pub models: ModelConfig,
  #[serde(default)]
  pub generation: GenerationConfig,
  #[serde(default)]
  pub server: ServerConfig,
}

/// Locations of the dataset and the artifacts derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
  /// Cleaned bookings CSV
  #[serde(default = "default_dataset_path")]
  pub dataset: PathBuf,
  /// Persisted vector index
  #[serde(default = "default_index_path")]
  pub index: PathBuf,
  /// Persisted insights mapping
  #[serde(default = "default_insights_path")]
  pub insights: PathBuf,
  /// Revenue chart written by the analyze job
  #[serde(default = "default_plot_path")]
  pub plot: PathBuf,
}

/// Local model directories and encoder tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
  /// Directory holding `tokenizer.json` and `model.onnx` for the sentence encoder
  #[serde(default = "default_encoder_dir")]
  pub encoder_dir: PathBuf,
  /// Directory holding `tokenizer.json`, `encoder_model.onnx` and `decoder_model.onnx`
  #[serde(default = "default_generator_dir")]
  pub generator_dir: PathBuf,
  /// Number of texts fed to the encoder per inference call
  #[serde(default = "default_batch_size")]
  pub batch_size: usize,
  /// Token limit applied by the encoder tokenizer
  #[serde(default = "default_max_sequence_length")]
  pub max_sequence_length: usize,
}

/// Decoding options for the generative fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
  #[serde(default = "default_max_new_tokens")]
  pub max_new_tokens: usize,
  #[serde(default = "default_do_sample")]
  pub do_sample: bool,
  #[serde(default = "default_top_k")]
  pub top_k: usize,
  #[serde(default = "default_temperature")]
  pub temperature: f32,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_bind")]
  pub bind: SocketAddr,
  /// Maximum entries retained by the in-memory log buffer
  #[serde(default = "default_log_capacity")]
  pub log_capacity: usize,
}

fn default_dataset_path() -> PathBuf {
  PathBuf::from("data/cleaned_bookings.csv")
}
fn default_index_path() -> PathBuf {
  PathBuf::from("data/bookings.index")
}
fn default_insights_path() -> PathBuf {
  PathBuf::from("data/insights.json")
}
fn default_plot_path() -> PathBuf {
  PathBuf::from("data/revenue_trends.png")
}
fn default_encoder_dir() -> PathBuf {
  PathBuf::from("models/all-MiniLM-L6-v2")
}
fn default_generator_dir() -> PathBuf {
  PathBuf::from("models/flan-t5-small")
}
fn default_batch_size() -> usize {
  64
}
fn default_max_sequence_length() -> usize {
  256
}
fn default_max_new_tokens() -> usize {
  50
}
fn default_do_sample() -> bool {
  true
}
fn default_top_k() -> usize {
  50
}
fn default_temperature() -> f32 {
  1.0
}
fn default_bind() -> SocketAddr {
  SocketAddr::from(([127, 0, 0, 1], 8000))
}
fn default_log_capacity() -> usize {
  1000
}

impl Default for DataConfig {
  fn default() -> Self {
    Self {
      dataset: default_dataset_path(),
      index: default_index_path(),
      insights: default_insights_path(),
      plot: default_plot_path(),
    }
  }
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      encoder_dir: default_encoder_dir(),
      generator_dir: default_generator_dir(),
      batch_size: default_batch_size(),
      max_sequence_length: default_max_sequence_length(),
    }
  }
}

impl Default for GenerationConfig {
  fn default() -> Self {
    Self {
      max_new_tokens: default_max_new_tokens(),
      do_sample: default_do_sample(),
      top_k: default_top_k(),
      temperature: default_temperature(),
    }
  }
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self { bind: default_bind(), log_capacity: default_log_capacity() }
  }
}

impl Config {
  /// Load configuration from a YAML file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&content)
      .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
  }

  /// Resolve configuration from an explicit path, the environment, or well-known locations
  ///
  /// An explicit path (argument or `CONCIERGE_CONFIG`) must exist. The local
  /// `concierge.yaml` and the user config directory are optional.
  pub fn load(explicit: Option<&Path>) -> Result<Self> {
    if let Some(path) = explicit {
      return Self::load_from_file(path);
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
      if !path.trim().is_empty() {
        return Self::load_from_file(path);
      }
    }

    for candidate in implicit_config_paths() {
      if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "using config file");
        return Self::load_from_file(candidate);
      }
    }

    Ok(Self::default())
  }

  fn validate(&self) -> Result<()> {
    if self.models.batch_size == 0 {
      return Err(anyhow!("models.batch_size must be greater than zero"));
    }
    if self.generation.max_new_tokens == 0 {
      return Err(anyhow!("generation.max_new_tokens must be greater than zero"));
    }
    if self.generation.temperature <= 0.0 {
      return Err(anyhow!("generation.temperature must be positive"));
    }
    Ok(())
  }
}

fn implicit_config_paths() -> Vec<PathBuf> {
  let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
  if let Some(config_dir) = dirs::config_dir() {
    paths.push(config_dir.join("concierge").join("config.yaml"));
  }
  paths
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let yaml = "data:\n  dataset: /srv/bookings.csv\ngeneration:\n  do_sample: false\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(config.data.dataset, PathBuf::from("/srv/bookings.csv"));
    assert_eq!(config.data.index, default_index_path());
    assert!(!config.generation.do_sample);
    assert_eq!(config.generation.max_new_tokens, 50);
    assert_eq!(config.server.bind, "127.0.0.1:8000".parse().unwrap());
  }

  #[test]
  fn test_validate_rejects_zero_batch_size() {
    let mut config = Config::default();
    config.models.batch_size = 0;
    assert!(config.validate().is_err());
  }
}
