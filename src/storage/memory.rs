//! In-process stores backed by `DashMap`

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{AppError, Result};
use crate::storage::models::{GenerationRecord, GenerationStatus, UsageAggregate, UsageSample};
use crate::storage::{GenerationStore, UsageStore};

/// Generation records keyed by surrogate id
pub struct MemoryGenerationStore {
    records: DashMap<u64, GenerationRecord>,
    next_id: AtomicU64,
}

impl MemoryGenerationStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn sorted_newest_first(mut records: Vec<GenerationRecord>) -> Vec<GenerationRecord> {
        records.sort_by_key(|r| Reverse((r.created_at, r.id)));
        records
    }
}

impl Default for MemoryGenerationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationStore for MemoryGenerationStore {
    async fn create(&self, mut record: GenerationRecord) -> Result<GenerationRecord> {
        record.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, record: &GenerationRecord) -> Result<()> {
        match self.records.get_mut(&record.id) {
            Some(mut existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("generation record {}", record.id))),
        }
    }

    async fn get(&self, id: u64) -> Result<Option<GenerationRecord>> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn list_by_actor(&self, actor_id: &str) -> Result<Vec<GenerationRecord>> {
        let records = self
            .records
            .iter()
            .filter(|r| r.actor_id == actor_id)
            .map(|r| r.value().clone())
            .collect();
        Ok(Self::sorted_newest_first(records))
    }

    async fn list_recent_successful(&self, limit: usize) -> Result<Vec<GenerationRecord>> {
        let records = self
            .records
            .iter()
            .filter(|r| r.status == GenerationStatus::Success)
            .map(|r| r.value().clone())
            .collect();
        let mut records = Self::sorted_newest_first(records);
        records.truncate(limit);
        Ok(records)
    }
}

/// Usage rows keyed by `(actor, day)`
pub struct MemoryUsageStore {
    rows: DashMap<(String, NaiveDate), UsageAggregate>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }

    fn sorted_newest_first(mut rows: Vec<UsageAggregate>) -> Vec<UsageAggregate> {
        rows.sort_by(|a, b| b.day.cmp(&a.day).then_with(|| a.actor_id.cmp(&b.actor_id)));
        rows
    }
}

impl Default for MemoryUsageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn merge(
        &self,
        actor_id: &str,
        day: NaiveDate,
        sample: UsageSample,
    ) -> Result<UsageAggregate> {
        // The entry guard holds the shard lock for the whole read-modify-write.
        let row = self
            .rows
            .entry((actor_id.to_string(), day))
            .and_modify(|row| row.absorb(sample))
            .or_insert_with(|| UsageAggregate::first(actor_id, day, sample));
        Ok(row.value().clone())
    }

    async fn get(&self, actor_id: &str, day: NaiveDate) -> Result<Option<UsageAggregate>> {
        Ok(self
            .rows
            .get(&(actor_id.to_string(), day))
            .map(|r| r.value().clone()))
    }

    async fn list_by_actor(&self, actor_id: &str) -> Result<Vec<UsageAggregate>> {
        let rows = self
            .rows
            .iter()
            .filter(|r| r.actor_id == actor_id)
            .map(|r| r.value().clone())
            .collect();
        Ok(Self::sorted_newest_first(rows))
    }

    async fn list_since(&self, since: NaiveDate) -> Result<Vec<UsageAggregate>> {
        let rows = self
            .rows
            .iter()
            .filter(|r| r.day >= since)
            .map(|r| r.value().clone())
            .collect();
        Ok(Self::sorted_newest_first(rows))
    }
}
