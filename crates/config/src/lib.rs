//! Configuration loading, validation, and management for chatrelay.
//!
//! Loads configuration from a TOML file with environment variable
//! overrides (`DATABASE_URL`, `OLLAMA_HOST`). Validates all settings at
//! startup so a misconfigured deployment fails fast instead of mid-stream.

use chatrelay_core::generator::GenerationOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
///
/// Maps directly to `chatrelay.toml`.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream generation service settings
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// History store settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Streaming relay settings
    #[serde(default)]
    pub relay: RelayConfig,

    /// Assistant persona and locale settings
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Weather fact provider settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("server", &self.server)
            .field("upstream", &self.upstream)
            .field("history", &self.history)
            .field("relay", &self.relay)
            .field("assistant", &self.assistant)
            .field("weather_api_key", &redact(&self.weather.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the generation service.
    #[serde(default = "default_upstream_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Strings that end generation early.
    #[serde(default = "default_stop")]
    pub stop: Vec<String>,

    /// Upper bound on total streaming duration in seconds.
    /// Unset means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_timeout_secs: Option<u64>,
}

fn default_upstream_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "llama3:8b".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_top_p() -> f32 {
    0.9
}
fn default_stop() -> Vec<String> {
    vec!["<|eot_id|>".into(), "<|end_of_text|>".into()]
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            stop: default_stop(),
            stream_timeout_secs: None,
        }
    }
}

impl UpstreamConfig {
    /// Sampling options for the generation request.
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            stop: self.stop.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Storage backend: "sqlite" or "postgres".
    #[serde(default = "default_history_backend")]
    pub backend: String,

    /// Connection string / database path for the backend.
    #[serde(default = "default_history_url")]
    pub url: String,

    /// Maximum retained turns per identity (capacity C).
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Recency window used for context assembly (K).
    #[serde(default = "default_window")]
    pub window: u32,
}

fn default_history_backend() -> String {
    "sqlite".into()
}
fn default_history_url() -> String {
    "chatrelay.db".into()
}
fn default_capacity() -> u32 {
    100
}
fn default_window() -> u32 {
    4
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: default_history_backend(),
            url: default_history_url(),
            capacity: default_capacity(),
            window: default_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Disallowed substrings: fragments containing any of these are
    /// suppressed from the stream and the persisted transcript.
    #[serde(default = "default_blocked_markers")]
    pub blocked_markers: Vec<String>,
}

fn default_blocked_markers() -> Vec<String> {
    vec!["<|".into()]
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            blocked_markers: default_blocked_markers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    /// UTC offset used by the clock fact (default +9, KST).
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,
}

fn default_system_instruction() -> String {
    "You are a capable and friendly assistant. Answer the current question \
     directly and concisely, in two or three sentences. Use the earlier \
     conversation only to understand context; never repeat past answers. \
     Mention the facts under [Current context] only when they are relevant."
        .into()
}
fn default_utc_offset() -> i32 {
    9
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            system_instruction: default_system_instruction(),
            utc_offset_hours: default_utc_offset(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key. Weather facts are disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then apply
    /// environment overrides and validate.
    ///
    /// `DATABASE_URL` overrides `history.url` (and flips the backend to
    /// postgres when it carries a postgres scheme); `OLLAMA_HOST` overrides
    /// the upstream host, keeping the default port.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|e| ConfigError::Io {
                    path: p.display().to_string(),
                    source: e,
                })?;
                let config: Self = toml::from_str(&raw)?;
                info!(path = %p.display(), "Loaded configuration");
                config
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                if url.starts_with("postgres://") || url.starts_with("postgresql://") {
                    self.history.backend = "postgres".into();
                }
                self.history.url = url;
            }
        }
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            if !host.is_empty() {
                self.upstream.base_url = format!("http://{host}:11434");
            }
        }
    }

    /// Reject configurations that cannot serve a single request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.model.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream.model must not be empty".into()));
        }
        if self.history.capacity == 0 {
            return Err(ConfigError::Invalid("history.capacity must be at least 1".into()));
        }
        if self.history.window == 0 {
            return Err(ConfigError::Invalid("history.window must be at least 1".into()));
        }
        if self.history.window > self.history.capacity {
            return Err(ConfigError::Invalid(
                "history.window must not exceed history.capacity".into(),
            ));
        }
        match self.history.backend.as_str() {
            "sqlite" | "postgres" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown history backend '{other}' (expected sqlite or postgres)"
                )));
            }
        }
        Ok(())
    }
}
