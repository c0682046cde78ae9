//! HTTP client for the concierge REST API
//!
//! A thin reqwest wrapper used by the CLI subcommands that talk to a
//! running `concierge_server`.

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Response};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::server::models::insights::Insights;
use crate::server::types::{AskRequest, AskResponse, BaseResponse, LogsResponse, StatusResponse};

pub const SERVER_URL_ENV_VAR: &str = "CONCIERGE_SERVER_URL";
pub const TIMEOUT_ENV_VAR: &str = "CONCIERGE_TIMEOUT_SECS";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Configuration for the concierge HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// Base URL of the server (e.g., "http://127.0.0.1:8000")
  pub base_url: String,
  /// Request timeout in seconds; generation can be slow
  pub timeout_secs: u64,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self { base_url: DEFAULT_SERVER_URL.to_string(), timeout_secs: 120 }
  }
}

impl ClientConfig {
  /// Defaults overridden by `CONCIERGE_SERVER_URL` / `CONCIERGE_TIMEOUT_SECS`
  pub fn from_env() -> Self {
    let defaults = Self::default();
    let base_url = std::env::var(SERVER_URL_ENV_VAR).unwrap_or(defaults.base_url);
    let timeout_secs = std::env::var(TIMEOUT_ENV_VAR)
      .ok()
      .and_then(|value| value.parse().ok())
      .unwrap_or(defaults.timeout_secs);

    Self { base_url, timeout_secs }
  }
}

/// HTTP client for the concierge REST API
pub struct ConciergeClient {
  client: Client,
  config: ClientConfig,
}

impl ConciergeClient {
  pub fn with_config(config: ClientConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .context("Failed to create HTTP client")?;

    Ok(Self { client, config: ClientConfig { base_url: trim_base(&config.base_url), ..config } })
  }

  pub fn base_url(&self) -> &str {
    &self.config.base_url
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url, path)
  }

  async fn send<F>(&self, request: F, action: &str) -> Result<Response>
  where
    F: Future<Output = reqwest::Result<Response>>,
  {
    let response = timeout(Duration::from_secs(self.config.timeout_secs), request)
      .await
      .map_err(|_| anyhow!("Timed out while trying to {action}"))?
      .with_context(|| format!("Could not reach concierge server at {}", self.config.base_url))?;

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await.unwrap_or_default();
      return Err(anyhow!("Failed to {action}: HTTP {status} {error_text}"));
    }
    Ok(response)
  }

  /// Ask a question
  pub async fn ask(&self, question: &str) -> Result<AskResponse> {
    let request = AskRequest { question: question.to_string() };
    let response = self.client.post(self.url("/ask")).json(&request).send();
    let response = self.send(response, "ask question").await?;
    Ok(response.json().await?)
  }

  /// Fetch the precomputed insights
  pub async fn analytics(&self) -> Result<Insights> {
    let request = self.client.get(self.url("/analytics")).send();
    let response = self.send(request, "fetch analytics").await?;
    Ok(response.json().await?)
  }

  /// Fetch the revenue chart as PNG bytes
  pub async fn plot(&self) -> Result<Vec<u8>> {
    let request = self.client.get(self.url("/analytics/plot")).send();
    let response = self.send(request, "fetch revenue chart").await?;
    Ok(response.bytes().await?.to_vec())
  }

  /// Server health and loaded data sizes
  pub async fn status(&self) -> Result<BaseResponse<StatusResponse>> {
    let response = self.send(self.client.get(self.url("/status")).send(), "fetch status").await?;
    Ok(response.json().await?)
  }

  /// Recent server log entries
  pub async fn logs(&self, limit: usize, level: &str) -> Result<BaseResponse<LogsResponse>> {
    let request = self
      .client
      .get(self.url("/logs"))
      .query(&[("limit", limit.to_string()), ("level", level.to_string())])
      .send();
    let response = self.send(request, "fetch logs").await?;
    Ok(response.json().await?)
  }
}

fn trim_base(url: &str) -> String {
  url.trim_end_matches('/').to_string()
}

/// Client configured from the environment, or from an explicit server URL
pub fn get_client(server: Option<&str>) -> Result<ConciergeClient> {
  let mut config = ClientConfig::from_env();
  if let Some(server) = server {
    config.base_url = server.to_string();
  }
  ConciergeClient::with_config(config)
}
