//! Pattern rules answered directly from the dataset and insights
//!
//! Each rule sees the lower-cased question. Returning `None` means the rule
//! does not apply and the next one is tried.

use anyhow::{Context, Result};
use regex::Regex;

use super::QueryContext;
use crate::server::models::insights::{month_display_name, month_number};

/// Number of countries listed by the cancellation rule
pub const TOP_CANCELLATION_COUNTRIES: usize = 3;

/// One predicate/handler pair in the router's rule list
pub trait QueryRule: Send + Sync {
  /// Short identifier used in logs
  fn name(&self) -> &'static str;

  /// Answer the question, or `None` when the rule does not apply
  fn answer(&self, question: &str, context: &QueryContext<'_>) -> Option<String>;
}

/// "revenue ... in <month> <year>"
pub struct RevenueByMonthRule {
  pattern: Regex,
}

impl RevenueByMonthRule {
  pub fn new() -> Result<Self> {
    let pattern = Regex::new(r"revenue.*(?:in|for)\s+(\w+)\s+(\d{4})")
      .context("Failed to compile revenue pattern")?;
    Ok(Self { pattern })
  }
}

impl QueryRule for RevenueByMonthRule {
  fn name(&self) -> &'static str {
    "revenue-by-month"
  }

  fn answer(&self, question: &str, context: &QueryContext<'_>) -> Option<String> {
    let captures = self.pattern.captures(question)?;
    let month = month_number(captures.get(1)?.as_str())?;
    let year_text = captures.get(2)?.as_str();
    let year: i32 = year_text.parse().ok()?;
    let month_name = month_display_name(month)?;

    Some(match context.insights.revenue_for(year, month) {
      Some(revenue) => format!("Total revenue in {month_name} {year_text} was ${revenue:.2}"),
      None => format!("No revenue data found for {month_name} {year_text}."),
    })
  }
}

/// Questions about cancellations by location
pub struct CancellationsByLocationRule;

impl QueryRule for CancellationsByLocationRule {
  fn name(&self) -> &'static str {
    "cancellations-by-location"
  }

  fn answer(&self, question: &str, context: &QueryContext<'_>) -> Option<String> {
    if !(question.contains("cancellation") && question.contains("location")) {
      return None;
    }

    let top = context.dataset.cancellations_by_country(TOP_CANCELLATION_COUNTRIES);
    if top.is_empty() {
      return Some("No cancellations found in the dataset.".to_string());
    }

    let listing: Vec<String> =
      top.iter().map(|(country, count)| format!("{country} ({count})")).collect();
    Some(format!("Top 3 countries with highest cancellations: {}", listing.join(", ")))
  }
}

/// Questions about the average daily rate
pub struct AveragePriceRule;

impl QueryRule for AveragePriceRule {
  fn name(&self) -> &'static str {
    "average-price"
  }

  fn answer(&self, question: &str, context: &QueryContext<'_>) -> Option<String> {
    if !(question.contains("average price") || question.contains("average adr")) {
      return None;
    }

    Some(match context.dataset.average_adr() {
      Some(mean) => format!("The average price (ADR) of a booking is ${mean:.2}"),
      None => "No bookings are loaded, so no average price is available.".to_string(),
    })
  }
}

/// The built-in rules in evaluation order
pub fn default_rules() -> Result<Vec<Box<dyn QueryRule>>> {
  Ok(vec![
    Box::new(RevenueByMonthRule::new()?),
    Box::new(CancellationsByLocationRule),
    Box::new(AveragePriceRule),
  ])
}
