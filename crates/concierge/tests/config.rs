use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;

use concierge::config::{Config, CONFIG_ENV_VAR};

fn write_config(dir: &TempDir, name: &str, dataset: &str) -> PathBuf {
  let path = dir.path().join(name);
  std::fs::write(&path, format!("data:\n  dataset: {dataset}\nserver:\n  bind: 0.0.0.0:9100\n"))
    .unwrap();
  path
}

#[test]
#[serial]
fn test_explicit_path_beats_environment() {
  let temp = TempDir::new().unwrap();
  let explicit = write_config(&temp, "explicit.yaml", "explicit.csv");
  let from_env = write_config(&temp, "env.yaml", "env.csv");

  std::env::set_var(CONFIG_ENV_VAR, &from_env);
  let config = Config::load(Some(&explicit));
  std::env::remove_var(CONFIG_ENV_VAR);

  let config = config.unwrap();
  assert_eq!(config.data.dataset, PathBuf::from("explicit.csv"));
  assert_eq!(config.server.bind, "0.0.0.0:9100".parse().unwrap());
}

#[test]
#[serial]
fn test_environment_variable_is_used() {
  let temp = TempDir::new().unwrap();
  let from_env = write_config(&temp, "env.yaml", "env.csv");

  std::env::set_var(CONFIG_ENV_VAR, &from_env);
  let config = Config::load(None);
  std::env::remove_var(CONFIG_ENV_VAR);

  assert_eq!(config.unwrap().data.dataset, PathBuf::from("env.csv"));
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
  let temp = TempDir::new().unwrap();
  let missing = temp.path().join("nope.yaml");

  let err = Config::load(Some(&missing)).unwrap_err();
  assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
  let temp = TempDir::new().unwrap();
  let path = temp.path().join("bad.yaml");
  std::fs::write(&path, "generation:\n  temperature: 0\n").unwrap();

  assert!(Config::load_from_file(&path).is_err());
}
