//! Application configuration types.
//!
//! Loaded by `esusync-infra::config` from environment variables or a
//! JSON/TOML file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub downloads: DownloadConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// REST backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL, e.g. `http://192.168.0.10:5000`.
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total HTTP attempts for idempotent requests (initial try + retries).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Push-channel subscription settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushConfig {
    /// Path of the event-stream endpoint, relative to the backend base URL.
    #[serde(default = "default_push_path")]
    pub path: String,
    /// Reconnect attempts before giving up on the push channel.
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
    /// Base delay between reconnect attempts; grows with each failure.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_base_delay_ms: u64,
}

impl PushConfig {
    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            path: default_push_path(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

/// Where downloaded artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_download_dir")]
    pub dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self { dir: default_download_dir() }
    }
}

/// Restart-recovery state cache location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { path: default_cache_path() }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> usize {
    3
}

fn default_push_path() -> String {
    "/events".to_string()
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    2000
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("esusync-state.json")
}
