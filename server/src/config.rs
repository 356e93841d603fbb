//! Server configuration.
//!
//! Values come from an optional TOML file and are then overridden by
//! environment variables:
//!
//! | Variable        | Field              |
//! |-----------------|--------------------|
//! | `DOCR_CONFIG`   | path of the file   |
//! | `GROQ_API_KEY`  | `vision.api_key`   |
//! | `DOCR_BIND`     | `bind`             |
//! | `DOCR_LOG`      | `log_level`        |
//! | `DOCR_MODEL`    | `vision.model`     |
//! | `DOCR_BASE_URL` | `vision.base_url`  |

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::OcrError;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.2-11b-vision-preview";
/// Data URLs are about a third larger than the image; 20 MiB covers phone photos.
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Largest request body accepted by the analysis route.
    pub max_body_bytes: usize,
    pub vision: VisionSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            log_level: "info".to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            vision: VisionSettings::default(),
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionSettings {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    /// Kept low so transcriptions stay close to deterministic.
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            top_p: 1.0,
            timeout_secs: 60,
        }
    }
}

impl fmt::Debug for VisionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("top_p", &self.top_p)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ServerConfig {
    /// Load from the config file (if any) and the process environment.
    pub fn load() -> Result<Self, OcrError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::load`] with an explicit environment lookup.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, OcrError> {
        let path = env("DOCR_CONFIG").map(PathBuf::from).or_else(Self::default_path);

        let mut config = match path {
            Some(ref p) if p.exists() => {
                info!("Loading config from {}", p.display());
                Self::from_file(p)?
            }
            _ => Self::default(),
        };

        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/docr/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("docr").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self, OcrError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            OcrError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, OcrError> {
        toml::from_str(text).map_err(|e| OcrError::Config(format!("Invalid config: {}", e)))
    }

    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GROQ_API_KEY") {
            self.vision.api_key = key;
        }
        if let Some(bind) = non_empty("DOCR_BIND") {
            self.bind = bind;
        }
        if let Some(level) = non_empty("DOCR_LOG") {
            self.log_level = level;
        }
        if let Some(model) = non_empty("DOCR_MODEL") {
            self.vision.model = model;
        }
        if let Some(url) = non_empty("DOCR_BASE_URL") {
            self.vision.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), OcrError> {
        self.bind_addr()?;

        if self.vision.api_key.trim().is_empty() {
            return Err(OcrError::Config(
                "No vision API key configured. Set GROQ_API_KEY.".to_string(),
            ));
        }
        url::Url::parse(&self.vision.base_url).map_err(|e| {
            OcrError::Config(format!("Invalid base_url '{}': {}", self.vision.base_url, e))
        })?;
        if self.vision.model.trim().is_empty() {
            return Err(OcrError::Config("Model identifier is empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.vision.temperature) {
            return Err(OcrError::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.vision.temperature
            )));
        }
        if self.vision.max_tokens == 0 {
            return Err(OcrError::Config("max_tokens must be positive".to_string()));
        }
        if self.vision.timeout_secs == 0 {
            return Err(OcrError::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, OcrError> {
        self.bind
            .parse()
            .map_err(|e| OcrError::Config(format!("Invalid bind address '{}': {}", self.bind, e)))
    }
}
