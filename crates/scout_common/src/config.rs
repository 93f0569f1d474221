//! Configuration management for scoutd.
//!
//! Loads settings from `$SCOUT_CONFIG` or /etc/scout/config.toml, falls back
//! to defaults, then applies environment overrides (`GOOGLE_API_KEY`,
//! `SEARCH_ENGINE_ID`, `PORT`, `SCOUT_DATA_FILE`).

use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/scout/config.toml";

/// Env var naming an alternative config file
pub const CONFIG_ENV: &str = "SCOUT_CONFIG";

/// Learning file name inside the data directory
pub const LEARNING_FILE_NAME: &str = "learning_data.json";

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Web search provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Provider API key; empty means unset
    #[serde(default)]
    pub api_key: String,

    /// Custom search engine identifier
    #[serde(default = "default_engine_id")]
    pub engine_id: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_engine_id() -> String {
    "76aa978e57c0a4e5e".to_string()
}

fn default_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_max_results() -> usize {
    crate::types::MAX_SEARCH_RESULTS
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            engine_id: default_engine_id(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout(),
            max_results: default_max_results(),
        }
    }
}

impl SearchConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Learning store persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

fn default_data_file() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("scout"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(LEARNING_FILE_NAME)
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
        }
    }
}

/// Feature switches reported and checked by self-diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default = "enabled")]
    pub web_search: bool,
    #[serde(default = "enabled")]
    pub youtube_embedding: bool,
    #[serde(default = "enabled")]
    pub image_handling: bool,
    #[serde(default = "enabled")]
    pub learning: bool,
    #[serde(default = "enabled")]
    pub self_diagnosis: bool,
}

fn enabled() -> bool {
    true
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            web_search: true,
            youtube_embedding: true,
            image_handling: true,
            learning: true,
            self_diagnosis: true,
        }
    }
}

/// Advertised display limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_max_embeds")]
    pub max_images: usize,
    #[serde(default = "default_max_embeds")]
    pub max_videos: usize,
}

fn default_max_embeds() -> usize {
    3
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            max_images: default_max_embeds(),
            max_videos: default_max_embeds(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoutConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub learning: LearningConfig,

    #[serde(default)]
    pub capabilities: Capabilities,

    #[serde(default)]
    pub limits: Limits,
}

impl ScoutConfig {
    /// Load config from the configured path, then apply env overrides
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            Self::load_from_path(&path).unwrap_or_else(|e| {
                warn!("Invalid config at {}, using defaults: {}", path, e);
                Self::default()
            })
        } else {
            info!("No config at {}, using defaults", path);
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load config from specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: ScoutConfig =
            toml::from_str(&content).map_err(|e| ScoutError::Config(e.to_string()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`.
    ///
    /// Empty values are ignored; an unparsable `PORT` keeps the current port.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GOOGLE_API_KEY") {
            self.search.api_key = key;
        }
        if let Some(engine) = non_empty("SEARCH_ENGINE_ID") {
            self.search.engine_id = engine;
        }
        if let Some(port) = non_empty("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(file) = non_empty("SCOUT_DATA_FILE") {
            self.learning.data_file = PathBuf::from(file);
        }
    }
}
