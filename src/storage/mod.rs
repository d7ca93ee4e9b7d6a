//! Persistence collaborators for generation records and usage aggregates

pub mod memory;
pub mod models;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;

pub use memory::{MemoryGenerationStore, MemoryUsageStore};
pub use models::{
    ActorRequests, Completion, GenerationRecord, GenerationStatus, UsageAggregate, UsageSample,
};

/// CRUD access to generation audit rows
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Persist a new record and return it with its assigned id
    async fn create(&self, record: GenerationRecord) -> Result<GenerationRecord>;

    /// Overwrite an existing record
    async fn update(&self, record: &GenerationRecord) -> Result<()>;

    async fn get(&self, id: u64) -> Result<Option<GenerationRecord>>;

    /// Records for an actor, newest first
    async fn list_by_actor(&self, actor_id: &str) -> Result<Vec<GenerationRecord>>;

    /// Most recent successful records, newest first
    async fn list_recent_successful(&self, limit: usize) -> Result<Vec<GenerationRecord>>;
}

/// Per-(actor, day) usage rows
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Atomically fold `sample` into the row for `(actor_id, day)`, creating it if absent.
    /// Concurrent merges on the same key must not lose updates.
    async fn merge(
        &self,
        actor_id: &str,
        day: NaiveDate,
        sample: UsageSample,
    ) -> Result<UsageAggregate>;

    async fn get(&self, actor_id: &str, day: NaiveDate) -> Result<Option<UsageAggregate>>;

    /// Rows for an actor, newest day first
    async fn list_by_actor(&self, actor_id: &str) -> Result<Vec<UsageAggregate>>;

    /// Rows with `day >= since`, newest day first
    async fn list_since(&self, since: NaiveDate) -> Result<Vec<UsageAggregate>>;
}
