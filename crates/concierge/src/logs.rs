//! In-memory structured log buffer
//!
//! Every entry written here is also emitted as a `tracing` event, so the
//! console output and the `/logs` endpoint tell the same story.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Severity of a buffered log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Info,
  Success,
  Warn,
  Error,
}

impl LogLevel {
  /// Parse a level filter; `all` and unknown values yield `None`
  pub fn parse_filter(value: &str) -> Option<Self> {
    match value.to_ascii_lowercase().as_str() {
      "info" => Some(Self::Info),
      "success" => Some(Self::Success),
      "warn" | "warning" => Some(Self::Warn),
      "error" => Some(Self::Error),
      _ => None,
    }
  }
}

/// Request context attached to HTTP-originated entries
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LogContext {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub method: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub path: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status_code: Option<u16>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<f64>,
}

/// A single buffered log entry
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LogEntry {
  pub timestamp: DateTime<Utc>,
  pub level: LogLevel,
  pub message: String,
  pub component: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub context: Option<LogContext>,
}

/// Bounded, shareable ring buffer of recent log entries
#[derive(Clone)]
pub struct LogBuffer {
  inner: Arc<RwLock<VecDeque<LogEntry>>>,
  capacity: usize,
}

impl LogBuffer {
  pub fn new(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self { inner: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))), capacity }
  }

  /// Append an entry, evicting the oldest one when full
  pub async fn record(
    &self,
    level: LogLevel,
    message: &str,
    component: &str,
    context: Option<LogContext>,
  ) {
    emit_tracing_event(level, message, component);

    let mut entries = self.inner.write().await;
    if entries.len() >= self.capacity {
      entries.pop_front();
    }
    entries.push_back(LogEntry {
      timestamp: Utc::now(),
      level,
      message: message.to_string(),
      component: component.to_string(),
      context,
    });
  }

  pub async fn info(&self, message: &str, component: &str) {
    self.record(LogLevel::Info, message, component, None).await;
  }

  pub async fn success(&self, message: &str, component: &str) {
    self.record(LogLevel::Success, message, component, None).await;
  }

  pub async fn warn(&self, message: &str, component: &str) {
    self.record(LogLevel::Warn, message, component, None).await;
  }

  pub async fn error(&self, message: &str, component: &str) {
    self.record(LogLevel::Error, message, component, None).await;
  }

  /// Newest-first entries, optionally filtered by level and truncated
  pub async fn recent(&self, limit: Option<usize>, level: Option<LogLevel>) -> Vec<LogEntry> {
    let entries = self.inner.read().await;
    let matching = entries.iter().rev().filter(|entry| level.map_or(true, |l| entry.level == l));

    match limit {
      Some(limit) => matching.take(limit).cloned().collect(),
      None => matching.cloned().collect(),
    }
  }

  pub async fn len(&self) -> usize {
    self.inner.read().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.inner.read().await.is_empty()
  }
}

fn emit_tracing_event(level: LogLevel, message: &str, component: &str) {
  match level {
    LogLevel::Info | LogLevel::Success => tracing::info!(component, "{message}"),
    LogLevel::Warn => tracing::warn!(component, "{message}"),
    LogLevel::Error => tracing::error!(component, "{message}"),
  }
}
