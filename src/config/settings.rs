//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub provider: ProviderConfig,
    pub image: ImageConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Per-actor fixed-window rate limiting
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_requests_per_window() -> u32 {
    60
}

fn default_window_secs() -> u64 {
    60
}

fn default_cleanup_interval() -> u64 {
    300
}

/// Upstream generation provider (OpenAI compatible)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Inline API key; takes precedence over `api_key_env`
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
    /// Shared connect/response timeout for every provider call
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

fn default_timeout() -> u64 {
    60000
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_vision_model() -> String {
    "gpt-4o".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

impl ProviderConfig {
    /// Resolve the bearer credential, preferring the inline key
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| self.api_key_env.as_ref().and_then(|var| std::env::var(var).ok()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Accepted image uploads
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

fn default_max_file_size() -> usize {
    10 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    ["image/jpeg", "image/png", "image/gif", "image/webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl ImageConfig {
    pub fn is_allowed_type(&self, content_type: &str) -> bool {
        let content_type = content_type.to_lowercase();
        self.allowed_types.iter().any(|t| *t == content_type)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/gateway.yaml")
    }

    /// Load settings from a specific file, layered under `GENAI_GATEWAY__*` env overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let format = if path.extension().map_or(false, |ext| ext == "yaml" || ext == "yml") {
            FileFormat::Yaml
        } else {
            FileFormat::Toml
        };

        let mut builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("rate_limit.enabled", true)?
            .set_default("rate_limit.requests_per_window", default_requests_per_window())?
            .set_default("rate_limit.window_secs", default_window_secs())?
            .set_default("rate_limit.cleanup_interval_secs", default_cleanup_interval())?
            .set_default("provider.base_url", default_base_url())?
            .set_default("provider.timeout_ms", default_timeout())?
            .set_default("provider.default_model", default_model())?
            .set_default("provider.vision_model", default_vision_model())?
            .set_default("provider.image_model", default_image_model())?
            .set_default("provider.max_tokens", default_max_tokens())?
            .set_default("provider.temperature", f64::from(default_temperature()))?
            .set_default("image.max_file_size", default_max_file_size() as u64)?
            .set_default("image.allowed_types", default_allowed_types())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?;

        if path.exists() {
            builder = builder.add_source(File::from(path).format(format));
        }

        builder = builder.add_source(
            Environment::with_prefix("GENAI_GATEWAY")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }
        if self.rate_limit.requests_per_window == 0 {
            return Err(invalid("rate_limit.requests_per_window must be positive"));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(invalid("rate_limit.window_secs must be positive"));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(invalid("provider.base_url cannot be empty"));
        }
        if self.provider.timeout_ms == 0 {
            return Err(invalid("provider.timeout_ms must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Config(config::ConfigError::Message(message.to_string()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_window: default_requests_per_window(),
                window_secs: default_window_secs(),
                cleanup_interval_secs: default_cleanup_interval(),
            },
            provider: ProviderConfig {
                base_url: default_base_url(),
                api_key: None,
                api_key_env: default_api_key_env(),
                timeout_ms: default_timeout(),
                default_model: default_model(),
                vision_model: default_vision_model(),
                image_model: default_image_model(),
                max_tokens: default_max_tokens(),
                temperature: default_temperature(),
            },
            image: ImageConfig {
                max_file_size: default_max_file_size(),
                allowed_types: default_allowed_types(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
