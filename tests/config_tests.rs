//! Configuration and dataset loading tests
//!
//! Covers:
//! - Reading docsql.toml files
//! - Converting configuration into executor settings
//! - Loading JSON datasets and querying them

use docsql::{dataset, AppError, Config, QueryExecutor};
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_fixture(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write fixture");
    path
}

const DATASET: &str = r#"{
    "users": {
        "u1": {"name": "Alice", "joined": "2024-01-15T09:00:00Z"},
        "u2": {"name": "Bob", "joined": "2024-06-01T18:45:00Z"}
    },
    "users/u1/orders": [
        {"id": "o1", "total": 10},
        {"id": "o2", "total": 25}
    ]
}"#;

#[test]
fn test_load_explicit_config() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        &dir,
        "docsql.toml",
        "timezone = \"Asia/Tokyo\"\nbase_path = \"users/u1\"\ninclude_id = true\n",
    );

    let config = Config::load(Some(&path)).unwrap();
    let settings = config.settings().unwrap();
    assert_eq!(settings.timezone, Some(chrono_tz::Asia::Tokyo));
    assert_eq!(settings.base_path.as_deref(), Some("users/u1"));
    assert!(settings.include_id);
}

#[test]
fn test_invalid_config_values() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "bad.toml", "timezone = \"Nowhere/City\"\n");
    let config = Config::load(Some(&path)).unwrap();
    assert!(matches!(
        config.settings(),
        Err(AppError::InvalidTimezone(_))
    ));

    let path = write_fixture(&dir, "broken.toml", "timezone = [\n");
    assert!(matches!(
        Config::load(Some(&path)),
        Err(AppError::TomlError(_))
    ));
}

#[tokio::test]
async fn test_query_loaded_dataset() {
    let dir = TempDir::new().unwrap();
    let data = write_fixture(&dir, "shop.json", DATASET);
    let config_path = write_fixture(
        &dir,
        "docsql.toml",
        &format!(
            "data = {:?}\ntimezone = \"Asia/Tokyo\"\n",
            data.display().to_string()
        ),
    );

    let config = Config::load(Some(&config_path)).unwrap();
    let store = dataset::load_file(config.data.as_deref().unwrap()).unwrap();
    assert_eq!(store.len(), 4);

    let executor = QueryExecutor::with_settings(store, config.settings().unwrap());
    let rows = executor
        .execute("SELECT name, toDate(joined) FROM users WHERE joined < '2024-03-01'")
        .await
        .unwrap()
        .into_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("Alice"));
    assert_eq!(rows[0]["toDate(joined)"], json!("01/15/24 18:00:00"));

    let rows = executor
        .execute("SELECT id, total FROM users/u1/orders ORDER BY total DESC")
        .await
        .unwrap()
        .into_rows();
    assert_eq!(rows[0]["id"], json!("o2"));
    assert_eq!(rows[1]["id"], json!("o1"));
}

#[test]
fn test_invalid_dataset() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "bad.json", r#"{"users/u1": {"x": {}}}"#);
    assert!(matches!(
        dataset::load_file(&path),
        Err(AppError::InvalidDataset(_))
    ));
}
