//! Gateway core - admission control, orchestration and usage accounting

pub mod orchestrator;
pub mod rate_limiter;
pub mod task;
pub mod usage;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub use orchestrator::{GenerationResponse, Orchestrator, ResponseStatus};
pub use rate_limiter::{RateLimiter, UNBOUNDED};
pub use task::{
    GenerationTask, ImageInput, ImageSource, TaskDefaults, TaskKind, TextInput, TextVariant,
    VisionInput,
};
pub use usage::UsageAccountant;

/// Actor used when the caller supplies no identity
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Pick the first non-blank identity, falling back to [`ANONYMOUS_ACTOR`]
pub fn resolve_actor<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|id| !id.is_empty())
        .unwrap_or(ANONYMOUS_ACTOR)
        .to_string()
}

/// Periodically purge stale rate limit windows
pub fn spawn_rate_limit_cleanup(limiter: Arc<RateLimiter>, interval_secs: u64) -> JoinHandle<()> {
    let period = Duration::from_secs(interval_secs.max(1));
    info!(interval_secs = period.as_secs(), "Starting rate limit cleanup task");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.cleanup();
            debug!(removed, tracked = limiter.tracked_actors(), "Rate limit cleanup finished");
        }
    })
}
