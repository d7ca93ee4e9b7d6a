//! Persisted generation records and per-day usage aggregates

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, Result};

/// Lifecycle state of a generation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Success,
    Error,
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationStatus::Pending => write!(f, "pending"),
            GenerationStatus::Success => write!(f, "success"),
            GenerationStatus::Error => write!(f, "error"),
        }
    }
}

/// Terminal outcome applied to a pending record
#[derive(Debug, Clone)]
pub enum Completion {
    Success { output: String, tokens_used: u32 },
    Error { message: String },
}

/// Audit row for one inbound generation request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    /// Surrogate id, assigned by the store on create
    pub id: u64,
    pub actor_id: String,
    pub prompt: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub status: GenerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl GenerationRecord {
    pub fn pending(
        actor_id: impl Into<String>,
        prompt: impl Into<String>,
        model: impl Into<String>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Self {
        Self {
            id: 0,
            actor_id: actor_id.into(),
            prompt: prompt.into(),
            model: model.into(),
            temperature,
            max_tokens,
            created_at: Utc::now(),
            status: GenerationStatus::Pending,
            output: None,
            tokens_used: None,
            processing_time_ms: None,
            error_message: None,
        }
    }

    /// Move a pending record to its terminal state. Fails if already completed.
    pub fn complete(&mut self, completion: Completion, processing_time_ms: u64) -> Result<()> {
        match self.status {
            GenerationStatus::Pending => {}
            GenerationStatus::Success | GenerationStatus::Error => {
                return Err(AppError::Internal(format!(
                    "generation record {} already completed as {}",
                    self.id, self.status
                )));
            }
        }

        match completion {
            Completion::Success { output, tokens_used } => {
                self.status = GenerationStatus::Success;
                self.output = Some(output);
                self.tokens_used = Some(tokens_used);
            }
            Completion::Error { message } => {
                self.status = GenerationStatus::Error;
                self.error_message = Some(message);
            }
        }
        self.processing_time_ms = Some(processing_time_ms);
        Ok(())
    }
}

/// One request's contribution to a usage aggregate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageSample {
    pub tokens: u64,
    pub success: bool,
    pub elapsed_ms: u64,
}

/// Per-actor, per-day rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageAggregate {
    pub actor_id: String,
    pub day: NaiveDate,
    pub requests_count: u64,
    pub tokens_used: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_processing_time_ms: f64,
}

impl UsageAggregate {
    /// Row created by the first request of the day
    pub fn first(actor_id: impl Into<String>, day: NaiveDate, sample: UsageSample) -> Self {
        Self {
            actor_id: actor_id.into(),
            day,
            requests_count: 1,
            tokens_used: sample.tokens,
            successful_requests: u64::from(sample.success),
            failed_requests: u64::from(!sample.success),
            avg_processing_time_ms: sample.elapsed_ms as f64,
        }
    }

    /// Fold one more request into the row, keeping the running mean
    pub fn absorb(&mut self, sample: UsageSample) {
        self.requests_count += 1;
        self.tokens_used += sample.tokens;
        if sample.success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }

        let n = (self.successful_requests + self.failed_requests) as f64;
        self.avg_processing_time_ms =
            (self.avg_processing_time_ms * (n - 1.0) + sample.elapsed_ms as f64) / n;
    }
}

/// Request count for one actor over a period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActorRequests {
    pub actor_id: String,
    pub requests: u64,
}
