//! Precomputed revenue insights and their JSON persistence

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::booking::Dataset;

/// Month names in calendar order, lower-case
pub const MONTH_NAMES: [&str; 12] = [
  "january",
  "february",
  "march",
  "april",
  "may",
  "june",
  "july",
  "august",
  "september",
  "october",
  "november",
  "december",
];

/// Two-digit month number for a month name, case-insensitive
pub fn month_number(name: &str) -> Option<u32> {
  let name = name.to_ascii_lowercase();
  MONTH_NAMES.iter().position(|month| *month == name).map(|index| index as u32 + 1)
}

/// Capitalised display form of a month name
pub fn month_display_name(number: u32) -> Option<String> {
  let name = MONTH_NAMES.get(number.checked_sub(1)? as usize)?;
  let mut chars = name.chars();
  let first = chars.next()?;
  Some(first.to_uppercase().chain(chars).collect())
}

/// Monthly revenue mapping as persisted on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Insights {
  /// Summed daily rate keyed by `YYYY-MM`
  pub revenue_trend: BTreeMap<String, f64>,
}

impl Insights {
  /// Aggregate revenue per month from the dataset
  pub fn compute(dataset: &Dataset) -> Self {
    Self { revenue_trend: dataset.monthly_revenue() }
  }

  /// Revenue for a calendar month, if any bookings fell in it
  pub fn revenue_for(&self, year: i32, month: u32) -> Option<f64> {
    self.revenue_trend.get(&format!("{year:04}-{month:02}")).copied()
  }

  /// Load a previously saved insights file
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read insights file {}", path.display()))?;
    serde_json::from_str(&content)
      .with_context(|| format!("Failed to parse insights file {}", path.display()))
  }

  /// Write the insights file, replacing any previous version
  pub fn save(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    self.serialize(&mut serializer).context("Failed to serialize insights")?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &buffer)
      .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
      .with_context(|| format!("Failed to replace insights file {}", path.display()))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_month_number_and_display() {
    assert_eq!(month_number("March"), Some(3));
    assert_eq!(month_number("smarch"), None);
    assert_eq!(month_display_name(12).as_deref(), Some("December"));
    assert_eq!(month_display_name(0), None);
  }

  #[test]
  fn test_save_and_load_round_trip_replaces_file() -> Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("nested").join("insights.json");

    let mut insights = Insights::default();
    insights.revenue_trend.insert("2017-03".to_string(), 15230.5);
    insights.save(&path)?;

    let content = std::fs::read_to_string(&path)?;
    assert!(content.contains("\"revenue_trend\""));
    assert!(content.contains("    \"revenue_trend\""));

    let replacement = Insights::default();
    replacement.save(&path)?;
    assert_eq!(Insights::load(&path)?, replacement);
    Ok(())
  }

  #[test]
  fn test_revenue_for_formats_key() {
    let mut insights = Insights::default();
    insights.revenue_trend.insert("2016-01".to_string(), 10.0);
    assert_eq!(insights.revenue_for(2016, 1), Some(10.0));
    assert_eq!(insights.revenue_for(2016, 2), None);
  }
}
