//! Per-actor daily usage accounting

use chrono::{Days, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::Result;
use crate::storage::{ActorRequests, UsageAggregate, UsageSample, UsageStore};

/// Maintains `UsageAggregate` rows and answers reporting queries over them
pub struct UsageAccountant {
    store: Arc<dyn UsageStore>,
}

impl UsageAccountant {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    /// Account one finished request against today's row.
    ///
    /// Failures are logged and swallowed; accounting never affects the
    /// outcome of the request that triggered it.
    pub async fn record(&self, actor_id: &str, tokens: u64, success: bool, elapsed_ms: u64) {
        self.record_on(actor_id, today(), tokens, success, elapsed_ms)
            .await
    }

    pub async fn record_on(
        &self,
        actor_id: &str,
        day: NaiveDate,
        tokens: u64,
        success: bool,
        elapsed_ms: u64,
    ) {
        let sample = UsageSample {
            tokens,
            success,
            elapsed_ms,
        };

        match self.store.merge(actor_id, day, sample).await {
            Ok(row) => debug!(
                actor = %actor_id,
                %day,
                requests = row.requests_count,
                "Updated usage stats"
            ),
            Err(e) => error!(actor = %actor_id, %day, error = %e, "Error updating usage stats"),
        }
    }

    /// All rows for an actor, newest first
    pub async fn actor_history(&self, actor_id: &str) -> Result<Vec<UsageAggregate>> {
        self.store.list_by_actor(actor_id).await
    }

    /// Rows within the last `days` days (today included), newest first
    pub async fn recent(&self, days: u32) -> Result<Vec<UsageAggregate>> {
        self.store.list_since(period_start(today(), days)).await
    }

    pub async fn total_requests(&self, days: u32) -> Result<u64> {
        Ok(self.recent(days).await?.iter().map(|r| r.requests_count).sum())
    }

    pub async fn total_tokens(&self, days: u32) -> Result<u64> {
        Ok(self.recent(days).await?.iter().map(|r| r.tokens_used).sum())
    }

    /// Actors ranked by request count, descending; ties broken by actor id
    pub async fn top_actors(&self, days: u32) -> Result<Vec<ActorRequests>> {
        let rows = self.recent(days).await?;
        Ok(rank_actors(&rows))
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// First day included in a window of `days` days ending on `today`
pub fn period_start(today: NaiveDate, days: u32) -> NaiveDate {
    let back = u64::from(days.saturating_sub(1));
    today.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN)
}

/// Sum requests per actor and sort descending by count, ascending by id
pub fn rank_actors(rows: &[UsageAggregate]) -> Vec<ActorRequests> {
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for row in rows {
        *totals.entry(row.actor_id.as_str()).or_insert(0) += row.requests_count;
    }

    let mut ranked: Vec<ActorRequests> = totals
        .into_iter()
        .map(|(actor_id, requests)| ActorRequests {
            actor_id: actor_id.to_string(),
            requests,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.requests
            .cmp(&a.requests)
            .then_with(|| a.actor_id.cmp(&b.actor_id))
    });
    ranked
}
