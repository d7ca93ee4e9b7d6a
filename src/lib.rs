//! GenAI Gateway
//!
//! A rate-limited gateway in front of a hosted generative AI provider. Each
//! request is admitted per actor, run against the provider as a tracked
//! generation, and rolled up into per-day usage statistics.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod storage;

pub use error::{AppError, Result};

use std::sync::Arc;

use backend::GenerationProvider;
use gateway::{Orchestrator, RateLimiter, TaskDefaults, UsageAccountant};
use storage::{GenerationStore, UsageStore};

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub rate_limiter: Arc<RateLimiter>,
    pub orchestrator: Arc<Orchestrator>,
    pub usage: Arc<UsageAccountant>,
}

impl AppState {
    /// Wire the gateway core from settings and its collaborators
    pub fn new(
        settings: config::Settings,
        provider: Arc<dyn GenerationProvider>,
        records: Arc<dyn GenerationStore>,
        usage_store: Arc<dyn UsageStore>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::from_config(&settings.rate_limit));
        let usage = Arc::new(UsageAccountant::new(usage_store));
        let orchestrator = Arc::new(Orchestrator::new(
            provider,
            records,
            usage.clone(),
            TaskDefaults::from(&settings.provider),
        ));

        Self {
            settings: Arc::new(settings),
            rate_limiter,
            orchestrator,
            usage,
        }
    }
}
