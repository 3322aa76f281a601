// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use tempfile::TempDir;
use till_core::CloseSignal;
use yare::parameterized;

use super::*;

#[test]
fn empty_file_uses_defaults() {
    let config = Config::parse("").unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.api.base_url, "http://localhost:8080/api");
    assert_eq!(config.interceptor_config().queue_timeout, Duration::from_secs(30));
    assert_eq!(config.token_config().expiry_buffer, Duration::from_secs(60));
    assert_eq!(config.token_config().validity_ttl, Duration::from_secs(5));
    assert_eq!(config.queue_config(), QueueConfig::default());
    assert!(config.realtime_config().is_none());
}

#[test]
fn missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load(&dir.path().join("config.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn partial_sections_keep_other_defaults() {
    let config = Config::parse(
        r#"
[api]
base_url = "https://pos.example.com/v2"

[queue]
max_auto_retries = 2
"#,
    )
    .unwrap();

    assert_eq!(config.api.base_url, "https://pos.example.com/v2");
    assert_eq!(config.api.refresh_path, "/auth/refresh");
    assert_eq!(config.queue_config().max_auto_retries, 2);
    assert_eq!(config.queue_config().item_timeout, Duration::from_secs(15));
}

#[test]
fn realtime_section_builds_connection_config() {
    let config = Config::parse(
        r#"
[realtime]
url = "wss://pos.example.com/live"
max_retries = 4
heartbeat_interval_ms = 0
auth_close_codes = [4401]
auth_reason_patterns = ["session revoked"]
"#,
    )
    .unwrap();

    let realtime = config.realtime_config().unwrap();
    assert_eq!(realtime.url, "wss://pos.example.com/live");
    assert_eq!(realtime.max_retries, 4);
    assert_eq!(realtime.initial_delay, Duration::from_millis(500));
    assert!(realtime.heartbeat_interval.is_zero());
    assert!(realtime.classifier.is_auth_close(&CloseSignal::new(4401, "")));
    assert!(!realtime.classifier.is_auth_close(&CloseSignal::new(4001, "")));
    assert!(realtime
        .classifier
        .is_auth_close(&CloseSignal::new(1008, "Session revoked by admin")));
}

#[parameterized(
    ftp_api = { "[api]\nbase_url = \"ftp://host/api\"" },
    relative_api = { "[api]\nbase_url = \"/api\"" },
    refresh_without_slash = { "[api]\nrefresh_path = \"auth/refresh\"" },
    http_realtime = { "[realtime]\nurl = \"http://host/live\"" },
    missing_realtime_url = { "[realtime]\nmax_retries = 1" },
    wrong_type = { "[queue]\nmax_auto_retries = \"five\"" },
)]
fn invalid_config_is_rejected(content: &str) {
    let err = Config::parse(content).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{err}");
}

#[test]
fn save_then_load_preserves_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let mut config = Config::default();
    config.interceptor.queue_timeout_ms = 5_000;

    config.save(&path).unwrap();

    assert_eq!(Config::load(&path).unwrap(), config);
}

#[test]
fn explicit_state_dir_wins() {
    let dir = TempDir::new().unwrap();
    let state = state_dir(Some(dir.path()));
    assert_eq!(state, dir.path());
    assert_eq!(queue_path(&state), dir.path().join("queue.jsonl"));
    assert_eq!(session_path(&state), dir.path().join("session.json"));
}
