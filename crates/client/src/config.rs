// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration is read from `config.toml` (by default under the user's
//! config directory) and includes:
//! - `[api]`: REST base URL, refresh endpoint, request timeout
//! - `[auth]`: expiry buffer and validity cache TTL
//! - `[interceptor]`: how long a request may wait for a token refresh
//! - `[queue]`: per-item timeout and retry policy
//! - `[realtime]`: WebSocket endpoint and reconnect policy (optional)
//!
//! Every field has a default, so an empty or missing file is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use till_core::close::{DEFAULT_AUTH_CLOSE_CODES, DEFAULT_AUTH_REASON_PATTERNS};
use till_core::CloseClassifier;
use url::Url;

use crate::auth::TokenConfig;
use crate::error::{Error, Result};
use crate::http::InterceptorConfig;
use crate::queue::QueueConfig;
use crate::realtime::RealtimeConfig;

const APP_DIR_NAME: &str = "till-sync";
const CONFIG_FILE_NAME: &str = "config.toml";
const QUEUE_FILE_NAME: &str = "queue.jsonl";
const SESSION_FILE_NAME: &str = "session.json";

/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "TILL_SYNC_STATE_DIR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub interceptor: InterceptorSection,
    #[serde(default)]
    pub queue: QueueSection,
    /// Realtime push channel (absent disables `watch`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime: Option<RealtimeSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the token refresh endpoint, relative to `base_url`.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
            refresh_path: default_refresh_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_refresh_path() -> String {
    "/auth/refresh".to_string()
}

fn default_request_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// A token expiring within this many seconds is refreshed first.
    #[serde(default = "default_expiry_buffer_secs")]
    pub expiry_buffer_secs: u64,
    /// How long an expiry verdict is reused, in milliseconds.
    #[serde(default = "default_validity_ttl_ms")]
    pub validity_ttl_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            expiry_buffer_secs: default_expiry_buffer_secs(),
            validity_ttl_ms: default_validity_ttl_ms(),
        }
    }
}

fn default_expiry_buffer_secs() -> u64 {
    60
}

fn default_validity_ttl_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterceptorSection {
    /// Max time a request waits for a token refresh, in milliseconds.
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: u64,
}

impl Default for InterceptorSection {
    fn default() -> Self {
        InterceptorSection {
            queue_timeout_ms: default_queue_timeout_ms(),
        }
    }
}

fn default_queue_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSection {
    /// Max time one delivery may take, in seconds.
    #[serde(default = "default_item_timeout_secs")]
    pub item_timeout_secs: u64,
    /// Failures after which only an explicit retry re-attempts an item.
    #[serde(default = "default_max_auto_retries")]
    pub max_auto_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_secs")]
    pub retry_max_delay_secs: u64,
}

impl Default for QueueSection {
    fn default() -> Self {
        QueueSection {
            item_timeout_secs: default_item_timeout_secs(),
            max_auto_retries: default_max_auto_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_secs: default_retry_max_delay_secs(),
        }
    }
}

fn default_item_timeout_secs() -> u64 {
    15
}

fn default_max_auto_retries() -> u32 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_retry_max_delay_secs() -> u64 {
    300
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeSection {
    /// WebSocket endpoint (`ws://` or `wss://`).
    pub url: String,
    /// Consecutive failed attempts before giving up (default: 0 = unlimited).
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    /// Heartbeat ping interval in milliseconds (default: 30000). 0 = disabled.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Max time to wait for a pong in milliseconds (default: 10000).
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    /// Close codes the server uses to reject a credential.
    #[serde(default = "default_auth_close_codes")]
    pub auth_close_codes: Vec<u16>,
    /// Close reason fragments that mark a credential rejection.
    #[serde(default = "default_auth_reason_patterns")]
    pub auth_reason_patterns: Vec<String>,
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_secs() -> u64 {
    30
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

fn default_auth_close_codes() -> Vec<u16> {
    DEFAULT_AUTH_CLOSE_CODES.to_vec()
}

fn default_auth_reason_patterns() -> Vec<String> {
    DEFAULT_AUTH_REASON_PATTERNS.iter().map(|p| p.to_string()).collect()
}

impl Config {
    /// Loads configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parses and validates TOML content.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Checks URL schemes and required values.
    pub fn validate(&self) -> Result<()> {
        self.api_url()?;
        if !self.api.refresh_path.starts_with('/') {
            return Err(Error::Config(format!(
                "refresh_path must start with '/': {}",
                self.api.refresh_path
            )));
        }
        if let Some(realtime) = &self.realtime {
            let url = Url::parse(&realtime.url)
                .map_err(|e| Error::Config(format!("invalid realtime url '{}': {}", realtime.url, e)))?;
            if !matches!(url.scheme(), "ws" | "wss") {
                return Err(Error::Config(format!(
                    "invalid realtime url '{}': must be ws:// or wss://",
                    realtime.url
                )));
            }
        }
        Ok(())
    }

    /// The parsed API base URL.
    pub fn api_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api.base_url)
            .map_err(|e| Error::Config(format!("invalid api base_url '{}': {}", self.api.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "invalid api base_url '{}': must be http:// or https://",
                self.api.base_url
            )));
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            expiry_buffer: Duration::from_secs(self.auth.expiry_buffer_secs),
            validity_ttl: Duration::from_millis(self.auth.validity_ttl_ms),
        }
    }

    pub fn interceptor_config(&self) -> InterceptorConfig {
        InterceptorConfig {
            queue_timeout: Duration::from_millis(self.interceptor.queue_timeout_ms),
        }
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            item_timeout: Duration::from_secs(self.queue.item_timeout_secs),
            max_auto_retries: self.queue.max_auto_retries,
            retry_base_delay: Duration::from_millis(self.queue.retry_base_delay_ms),
            retry_max_delay: Duration::from_secs(self.queue.retry_max_delay_secs),
        }
    }

    /// Realtime settings, if a `[realtime]` section is present.
    pub fn realtime_config(&self) -> Option<RealtimeConfig> {
        let section = self.realtime.as_ref()?;
        Some(RealtimeConfig {
            url: section.url.clone(),
            max_retries: section.max_retries,
            initial_delay: Duration::from_millis(section.initial_delay_ms),
            max_delay: Duration::from_secs(section.max_delay_secs),
            heartbeat_interval: Duration::from_millis(section.heartbeat_interval_ms),
            heartbeat_timeout: Duration::from_millis(section.heartbeat_timeout_ms),
            classifier: CloseClassifier::new(
                section.auth_close_codes.clone(),
                section.auth_reason_patterns.clone(),
            ),
        })
    }
}

/// Default config file: `<config dir>/till-sync/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join(APP_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// State directory holding the queue, its lock and the session file.
///
/// Precedence: explicit override, `TILL_SYNC_STATE_DIR`, the user data dir.
pub fn state_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Some(dir) = std::env::var_os(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".till-sync"))
}

pub fn queue_path(state_dir: &Path) -> PathBuf {
    state_dir.join(QUEUE_FILE_NAME)
}

pub fn session_path(state_dir: &Path) -> PathBuf {
    state_dir.join(SESSION_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
