//! Display formatting utilities for CLI output

use colored::*;
use std::collections::BTreeMap;

use crate::logs::{LogEntry, LogLevel};
use crate::server::types::{AskResponse, StatusResponse};

const BAR_WIDTH: usize = 40;

/// Horizontal bar proportional to `value / max`
pub fn revenue_bar(value: f64, max: f64, width: usize) -> String {
  if max <= 0.0 || !value.is_finite() || value <= 0.0 {
    return String::new();
  }
  let filled = ((value / max) * width as f64).round() as usize;
  "█".repeat(filled.clamp(1, width))
}

/// One plain-text line per month: key, amount, bar
pub fn revenue_rows(series: &BTreeMap<String, f64>) -> Vec<String> {
  let max = series.values().copied().fold(0.0f64, f64::max);
  series
    .iter()
    .map(|(month, value)| {
      format!("{month}  {value:>12.2}  {}", revenue_bar(*value, max, BAR_WIDTH))
    })
    .collect()
}

pub fn display_answer(answer: &AskResponse) {
  match &answer.error {
    None => println!("{}", answer.response),
    Some(error) => {
      println!("{}", answer.response.yellow());
      println!("{} {}", "reason:".dimmed(), error.dimmed());
    }
  }
}

pub fn display_revenue(series: &BTreeMap<String, f64>) {
  if series.is_empty() {
    println!("No revenue data available.");
    return;
  }

  println!("{}", "Monthly revenue (sum of ADR)".blue().bold());
  for row in revenue_rows(series) {
    println!("  {row}");
  }
  let total: f64 = series.values().sum();
  println!("  {} {}", "total".bold(), format!("{total:.2}").green());
}

pub fn display_status(status: &StatusResponse) {
  println!("{} {} (v{})", "●".green(), status.status.green().bold(), status.version);
  println!("  records:   {}", status.records);
  println!("  index:     {} entries, dimension {}", status.index_entries, status.index_dimension);
  println!("  insights:  {} months", status.insight_months);
  if status.index_entries != status.records {
    let warning = "index and dataset sizes differ; rebuild with `concierge index`";
    println!("  {} {warning}", "⚠".yellow());
  }
}

pub fn display_log_entry(entry: &LogEntry) {
  let level = match entry.level {
    LogLevel::Info => "INFO".blue(),
    LogLevel::Success => "OK".green(),
    LogLevel::Warn => "WARN".yellow(),
    LogLevel::Error => "ERROR".red(),
  };
  let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S");

  let mut line = format!(
    "{} {:>5} [{}] {}",
    timestamp.to_string().dimmed(),
    level,
    entry.component,
    entry.message
  );
  if let Some(context) = &entry.context {
    if let (Some(method), Some(path)) = (&context.method, &context.path) {
      line.push_str(&format!(" {} {}", method, path).dimmed().to_string());
    }
    if let Some(status) = context.status_code {
      line.push_str(&format!(" {status}"));
    }
    if let Some(duration) = context.duration_ms {
      line.push_str(&format!(" {duration:.1}ms").dimmed().to_string());
    }
  }
  println!("{line}");
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_revenue_bar_scales_to_width() {
    assert_eq!(revenue_bar(50.0, 100.0, 10).chars().count(), 5);
    assert_eq!(revenue_bar(100.0, 100.0, 10).chars().count(), 10);
    assert_eq!(revenue_bar(0.01, 100.0, 10).chars().count(), 1);
    assert!(revenue_bar(0.0, 100.0, 10).is_empty());
    assert!(revenue_bar(5.0, 0.0, 10).is_empty());
  }

  #[test]
  fn test_revenue_rows_follow_month_order() {
    let series = BTreeMap::from([("2016-02".to_string(), 20.0), ("2015-12".to_string(), 10.5)]);
    let rows = revenue_rows(&series);

    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("2015-12"));
    assert!(rows[0].contains("10.50"));
    assert!(rows[1].starts_with("2016-02"));
  }
}
