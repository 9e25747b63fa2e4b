//! Tests for loading `SyncConfig` from disk.

use std::io::Write;
use std::time::Duration;

use eventide::{ErrorCode, SyncConfig};
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn explicit_file_overrides_defaults() {
    let file = write_config(
        r#"
base_url = "https://api.example.com/v1"
api_key = "from-file"
debounce_ms = 250
cache_ttl_ms = 120000
cache_max_entries = 50
page_size = 25
known_sources = ["eventbrite", "meetup"]
"#,
    );

    let config = SyncConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.base_url, "https://api.example.com/v1");
    assert_eq!(config.api_key.as_deref(), Some("from-file"));
    assert_eq!(config.debounce_duration(), Duration::from_millis(250));
    assert_eq!(config.known_sources, vec!["eventbrite", "meetup"]);
    assert_eq!(config.request_timeout_duration(), Duration::from_secs(30));

    let cache = config.cache_config();
    assert_eq!(cache.ttl, Duration::from_secs(120));
    assert_eq!(cache.max_entries, 50);

    let options = config.query_options();
    assert_eq!(options.debounce, Duration::from_millis(250));
    assert_eq!(options.page_size, 25);
    assert!(options.cache_enabled);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SyncConfig::load(Some(dir.path().join("absent.toml").as_path())).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Configuration);
}

#[test]
fn malformed_file_is_an_error() {
    let file = write_config("page_size = \"twenty\"");
    let err = SyncConfig::load(Some(file.path())).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Configuration);
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
fn builder_matches_defaults() {
    let config = SyncConfig::new();
    assert_eq!(config.page_size, 20);
    assert_eq!(config.debounce_duration(), Duration::from_millis(300));
    assert_eq!(config.cache_ttl_duration(), Duration::from_secs(300));
    assert!(config.validate().is_ok());

    let tuned = SyncConfig::new()
        .debounce(Duration::from_millis(50))
        .cache_ttl(Duration::from_secs(10))
        .request_timeout(Duration::from_secs(5));
    assert_eq!(tuned.debounce_ms, 50);
    assert_eq!(tuned.cache_ttl_ms, 10_000);
    assert_eq!(tuned.request_timeout_ms, 5_000);
}
