//! Bridge configuration loaded from `comfy-relay.toml`.
//!
//! [`BridgeConfig`] holds every tunable of the job pipeline. Values missing from
//! the file fall back to defaults; `COMFY_*` environment variables (including
//! those loaded from `.env`) take precedence over the file. [`BridgeConfig::validate`]
//! is the single validation point and is called by the orchestrator constructor.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "comfy-relay.toml";

/// What to do when placeholders remain after substitution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderPolicy {
    /// Report them as warnings and submit the workflow anyway.
    #[default]
    Warn,
    /// Fail the job before contacting the server.
    Fail,
}

impl FromStr for PlaceholderPolicy {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(PlaceholderPolicy::Warn),
            "fail" => Ok(PlaceholderPolicy::Fail),
            other => Err(RelayError::Config(format!(
                "unknown placeholder policy {other:?} (expected \"warn\" or \"fail\")"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Base URL of the ComfyUI server.
    #[serde(default = "default_comfy_url")]
    pub comfy_url: String,

    /// Readiness probes before giving up.
    #[serde(default = "default_ready_max_retries")]
    pub ready_max_retries: u32,

    /// Milliseconds between readiness probes.
    #[serde(default = "default_ready_interval_ms")]
    pub ready_interval_ms: u64,

    /// History fetches before a job times out.
    #[serde(default = "default_poll_max_retries")]
    pub poll_max_retries: u32,

    /// Milliseconds between history fetches.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound for any single HTTP request to ComfyUI.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub placeholder_policy: PlaceholderPolicy,
}

fn default_comfy_url() -> String {
    "http://127.0.0.1:8188".to_string()
}

fn default_ready_max_retries() -> u32 {
    100
}

fn default_ready_interval_ms() -> u64 {
    100
}

fn default_poll_max_retries() -> u32 {
    250
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            comfy_url: default_comfy_url(),
            ready_max_retries: default_ready_max_retries(),
            ready_interval_ms: default_ready_interval_ms(),
            poll_max_retries: default_poll_max_retries(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            placeholder_policy: PlaceholderPolicy::default(),
        }
    }
}

fn parse_env<T: FromStr>(name: &str, raw: &str) -> Result<T, RelayError> {
    raw.trim()
        .parse()
        .map_err(|_| RelayError::Config(format!("{name}={raw:?} is not a valid value")))
}

impl BridgeConfig {
    /// Load from `path`, or from [`CONFIG_FILE`] when `path` is `None`, then apply
    /// environment overrides. A missing default file means defaults; a missing
    /// explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, RelayError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(CONFIG_FILE).exists() => Self::from_file(Path::new(CONFIG_FILE))?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, RelayError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Override fields from `COMFY_*` variables resolved through `lookup`.
    /// Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), RelayError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("COMFY_URL") {
            self.comfy_url = url.trim().to_string();
        }
        if let Some(raw) = var("COMFY_MAX_RETRIES") {
            self.ready_max_retries = parse_env("COMFY_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = var("COMFY_RETRIES_INTERVAL_MS") {
            self.ready_interval_ms = parse_env("COMFY_RETRIES_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = var("COMFY_MAX_POLLING_RETRIES") {
            self.poll_max_retries = parse_env("COMFY_MAX_POLLING_RETRIES", &raw)?;
        }
        if let Some(raw) = var("COMFY_POLLING_INTERVAL_MS") {
            self.poll_interval_ms = parse_env("COMFY_POLLING_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = var("COMFY_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_env("COMFY_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = var("COMFY_PLACEHOLDER_POLICY") {
            self.placeholder_policy = raw.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        let url = self.comfy_url.trim();
        if url.is_empty() {
            return Err(RelayError::Config("comfy_url must not be empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RelayError::Config(format!(
                "comfy_url must start with http:// or https://, got {url:?}"
            )));
        }
        if self.ready_max_retries == 0 {
            return Err(RelayError::Config("ready_max_retries must be at least 1".into()));
        }
        if self.poll_max_retries == 0 {
            return Err(RelayError::Config("poll_max_retries must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(RelayError::Config("request_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    pub fn ready_interval(&self) -> Duration {
        Duration::from_millis(self.ready_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
