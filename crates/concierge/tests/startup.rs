mod common;

use tempfile::TempDir;

use common::{KeywordEncoder, BOOKINGS_CSV};
use concierge::config::Config;
use concierge::server::models::booking::Dataset;
use concierge::server::models::insights::Insights;
use concierge::server::services::indexer::build_and_save_index;
use concierge::server::state::AppContext;

/// Write the bookings file, index and insights the server expects, built from `csv`
fn prepare_data(temp: &TempDir, csv: &str) -> Config {
  let mut config = Config::default();
  config.data.dataset = temp.path().join("bookings.csv");
  config.data.index = temp.path().join("bookings.index");
  config.data.insights = temp.path().join("insights.json");

  std::fs::write(&config.data.dataset, csv).unwrap();
  let dataset = Dataset::from_csv_str(csv).unwrap();
  build_and_save_index(&dataset, &KeywordEncoder, 64, &config.data.index).unwrap();
  Insights::compute(&dataset).save(&config.data.insights).unwrap();
  config
}

fn load_error(config: Config) -> String {
  match AppContext::load(config) {
    Ok(_) => panic!("context loaded against a stale index"),
    Err(e) => format!("{e:#}"),
  }
}

#[test]
fn test_reordered_dataset_is_rejected_at_startup() {
  let temp = TempDir::new().unwrap();
  let config = prepare_data(&temp, BOOKINGS_CSV);

  // Same rows, same count, different order
  let mut lines: Vec<&str> = BOOKINGS_CSV.lines().collect();
  lines[1..].reverse();
  std::fs::write(&config.data.dataset, lines.join("\n")).unwrap();

  let err = load_error(config);
  assert!(err.contains("different version of the dataset"), "{err}");
  assert!(err.contains("concierge index"), "{err}");
}

#[test]
fn test_edited_row_is_rejected_at_startup() {
  let temp = TempDir::new().unwrap();
  let config = prepare_data(&temp, BOOKINGS_CSV);

  std::fs::write(&config.data.dataset, BOOKINGS_CSV.replace("300.0", "310.0")).unwrap();

  assert!(load_error(config).contains("different version of the dataset"));
}
