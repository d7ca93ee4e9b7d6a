//! Configuration module

pub mod settings;

pub use settings::{
    ImageConfig, LoggingConfig, ProviderConfig, RateLimitConfig, ServerConfig, Settings,
};
