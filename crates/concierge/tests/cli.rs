use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use serial_test::serial;
use std::process::Command;

const BOOKINGS_CSV: &str = "\
hotel,is_canceled,adr,country,reservation_status,reservation_status_date
Resort Hotel,0,100.0,PRT,Check-Out,2016-02-03
City Hotel,1,50.5,GBR,Canceled,2016-01-20
City Hotel,0,25,ESP,Check-Out,2016-01-02
";

/// Helper to create a Command for the `concierge` binary with an isolated config.
fn concierge_cmd(dir: &assert_fs::TempDir) -> Command {
  let mut cmd = Command::cargo_bin("concierge").expect("binary exists");
  cmd.current_dir(dir.path());
  cmd.env_remove("CONCIERGE_CONFIG");
  cmd.env_remove("CONCIERGE_SERVER_URL");
  cmd
}

fn write_fixture(dir: &assert_fs::TempDir) -> std::path::PathBuf {
  std::fs::write(dir.path().join("bookings.csv"), BOOKINGS_CSV).unwrap();
  let config = dir.path().join("concierge.yaml");
  std::fs::write(
    &config,
    "data:\n  dataset: bookings.csv\n  insights: out/insights.json\n  plot: out/revenue_trends.png\n",
  )
  .unwrap();
  config
}

#[test]
#[serial]
fn test_analyze_writes_insights_and_chart() {
  let temp = assert_fs::TempDir::new().unwrap();
  let config = write_fixture(&temp);

  concierge_cmd(&temp)
    .args(["analyze", "--config"])
    .arg(&config)
    .assert()
    .success()
    .stdout(contains("Loaded 3 bookings").and(contains("Wrote 2 months of revenue")));

  let content = std::fs::read_to_string(temp.path().join("out/insights.json")).unwrap();
  let insights: Value = serde_json::from_str(&content).unwrap();
  assert_eq!(
    insights,
    serde_json::json!({ "revenue_trend": { "2016-01": 75.5, "2016-02": 100.0 } })
  );
  // 4-space indentation
  assert!(content.contains("\n    \"revenue_trend\""));

  let png = std::fs::read(temp.path().join("out/revenue_trends.png")).unwrap();
  assert!(png.starts_with(b"\x89PNG"));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_analyze_dataset_flag_overrides_config() {
  let temp = assert_fs::TempDir::new().unwrap();
  let config = write_fixture(&temp);

  concierge_cmd(&temp)
    .args(["analyze", "--dataset", "missing.csv", "--config"])
    .arg(&config)
    .assert()
    .failure()
    .stderr(contains("missing.csv"));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_ask_reports_unreachable_server() {
  let temp = assert_fs::TempDir::new().unwrap();

  concierge_cmd(&temp)
    .args(["ask", "--server", "http://127.0.0.1:9", "what", "is", "the", "average", "price"])
    .assert()
    .failure()
    .stderr(contains("Could not reach concierge server"));

  temp.close().unwrap();
}

#[test]
fn test_help_lists_commands() {
  Command::cargo_bin("concierge")
    .expect("binary exists")
    .arg("--help")
    .assert()
    .success()
    .stdout(contains("analyze").and(contains("index")).and(contains("ask")));
}
