//! Shared execution template for every generation variant
//!
//! `execute` writes a pending record, makes exactly one provider call, moves
//! the record to `Success` or `Error`, accounts usage and builds the response.
//! Provider failures never escape: they come back as an error-shaped
//! [`GenerationResponse`] with `status = "error"`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::backend::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ContentPart, GenerationProvider,
    ImageGenerationRequest, ImageGenerationResponse, ImageUrl,
};
use crate::error::{AppError, Result};
use crate::gateway::task::{
    GenerationTask, ImageInput, TaskDefaults, TaskKind, TextInput, TextVariant, VisionInput,
};
use crate::gateway::usage::UsageAccountant;
use crate::storage::{Completion, GenerationRecord, GenerationStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Uniform envelope returned by every variant, success or not
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    /// Correlation id, unrelated to the record id
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
    #[serde(skip)]
    pub record_id: Option<u64>,
}

impl GenerationResponse {
    fn success(task: &GenerationTask, record_id: u64, output: ProviderOutput) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: task.kind.label().to_string(),
            output: Some(output.response_text),
            model: Some(task.model.clone()),
            timestamp: Utc::now(),
            tokens_used: output.tokens_used,
            status: ResponseStatus::Success,
            error: None,
            image_urls: output.image_urls,
            revised_prompt: output.revised_prompt,
            record_id: Some(record_id),
        }
    }

    fn failure(kind: &TaskKind, record_id: Option<u64>, message: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: kind.label().to_string(),
            output: None,
            model: None,
            timestamp: Utc::now(),
            tokens_used: None,
            status: ResponseStatus::Error,
            error: Some(format!("{}: {}", kind.failure_message(), message)),
            image_urls: Vec::new(),
            revised_prompt: None,
            record_id,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// What a successful provider call yielded
#[derive(Debug, Clone)]
struct ProviderOutput {
    /// Stored on the record
    record_text: String,
    /// Returned to the caller
    response_text: String,
    tokens_used: Option<u32>,
    image_urls: Vec<String>,
    revised_prompt: Option<String>,
}

/// Runs generation tasks against the provider and keeps records and usage in step
pub struct Orchestrator {
    provider: Arc<dyn GenerationProvider>,
    records: Arc<dyn GenerationStore>,
    usage: Arc<UsageAccountant>,
    defaults: TaskDefaults,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        records: Arc<dyn GenerationStore>,
        usage: Arc<UsageAccountant>,
        defaults: TaskDefaults,
    ) -> Self {
        Self {
            provider,
            records,
            usage,
            defaults,
        }
    }

    pub fn defaults(&self) -> &TaskDefaults {
        &self.defaults
    }

    pub async fn generate(&self, input: TextInput) -> GenerationResponse {
        self.generate_text(TextVariant::Direct, input).await
    }

    pub async fn summarize(&self, input: TextInput) -> GenerationResponse {
        self.generate_text(TextVariant::Summarize, input).await
    }

    pub async fn creative(&self, input: TextInput) -> GenerationResponse {
        self.generate_text(TextVariant::Creative, input).await
    }

    pub async fn analyze(&self, input: TextInput) -> GenerationResponse {
        self.generate_text(TextVariant::Analyze, input).await
    }

    pub async fn generate_text(&self, variant: TextVariant, input: TextInput) -> GenerationResponse {
        self.execute(GenerationTask::text(variant, input, &self.defaults))
            .await
    }

    pub async fn analyze_image(&self, input: VisionInput) -> GenerationResponse {
        self.execute(GenerationTask::vision(input, &self.defaults))
            .await
    }

    pub async fn generate_image(&self, input: ImageInput) -> GenerationResponse {
        self.execute(GenerationTask::image_generation(input, &self.defaults))
            .await
    }

    /// Run one task end to end. Never fails; errors are folded into the response.
    pub async fn execute(&self, task: GenerationTask) -> GenerationResponse {
        let pending = GenerationRecord::pending(
            task.actor_id.clone(),
            task.record_prompt(),
            task.model.clone(),
            task.temperature,
            task.max_tokens,
        );

        let mut record = match self.records.create(pending).await {
            Ok(record) => record,
            Err(e) => {
                error!(actor = %task.actor_id, error = %e, "Failed to persist pending generation record");
                self.usage.record(&task.actor_id, 0, false, 0).await;
                return GenerationResponse::failure(&task.kind, None, &e.to_string());
            }
        };
        // Processing time covers the provider call, not the pending write.
        let started = Instant::now();

        info!(
            record_id = record.id,
            actor = %task.actor_id,
            model = %task.model,
            kind = task.kind.label(),
            "Calling generation provider"
        );

        let result = self.invoke(&task).await;
        let elapsed = elapsed_ms(started);

        match result {
            Ok(output) => {
                let tokens = output.tokens_used.unwrap_or(0);
                self.finish(
                    &mut record,
                    Completion::Success {
                        output: output.record_text.clone(),
                        tokens_used: tokens,
                    },
                    elapsed,
                )
                .await;
                self.usage
                    .record(&task.actor_id, u64::from(tokens), true, elapsed)
                    .await;

                info!(record_id = record.id, tokens, elapsed_ms = elapsed, "Generation succeeded");
                GenerationResponse::success(&task, record.id, output)
            }
            Err(e) => {
                let message = e.to_string();
                error!(record_id = record.id, error = %message, elapsed_ms = elapsed, "Generation failed");

                self.finish(
                    &mut record,
                    Completion::Error {
                        message: message.clone(),
                    },
                    elapsed,
                )
                .await;
                self.usage.record(&task.actor_id, 0, false, elapsed).await;

                GenerationResponse::failure(&task.kind, Some(record.id), &message)
            }
        }
    }

    async fn finish(&self, record: &mut GenerationRecord, completion: Completion, elapsed_ms: u64) {
        if let Err(e) = record.complete(completion, elapsed_ms) {
            error!(record_id = record.id, error = %e, "Refusing generation record transition");
            return;
        }
        if let Err(e) = self.records.update(record).await {
            error!(record_id = record.id, error = %e, "Failed to persist completed generation record");
        }
    }

    async fn invoke(&self, task: &GenerationTask) -> Result<ProviderOutput> {
        match &task.kind {
            TaskKind::Text => {
                let request = ChatCompletionRequest {
                    model: task.model.clone(),
                    messages: vec![ChatMessage::user_text(task.prompt.clone())],
                    max_tokens: task.max_tokens,
                    temperature: task.temperature,
                };
                chat_output(self.provider.chat_completion(request).await?)
            }
            TaskKind::Vision { image_url, detail } => {
                let request = ChatCompletionRequest {
                    model: task.model.clone(),
                    messages: vec![ChatMessage::user_parts(vec![
                        ContentPart::Text {
                            text: task.prompt.clone(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: image_url.clone(),
                                detail: Some(detail.clone()),
                            },
                        },
                    ])],
                    max_tokens: task.max_tokens,
                    temperature: task.temperature,
                };
                chat_output(self.provider.chat_completion(request).await?)
            }
            TaskKind::ImageGeneration(options) => {
                let request = ImageGenerationRequest {
                    model: task.model.clone(),
                    prompt: task.prompt.clone(),
                    n: options.n,
                    size: options.size.clone(),
                    quality: options.quality.clone(),
                    style: options.style.clone(),
                    response_format: "url".to_string(),
                };
                image_output(self.provider.generate_images(request).await?)
            }
        }
    }

    /// Generation records for an actor, newest first
    pub async fn history(&self, actor_id: &str) -> Result<Vec<GenerationRecord>> {
        self.records.list_by_actor(actor_id).await
    }

    pub async fn record(&self, id: u64) -> Result<GenerationRecord> {
        self.records
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("generation record {}", id)))
    }

    pub async fn recent_successful(&self, limit: usize) -> Result<Vec<GenerationRecord>> {
        self.records.list_recent_successful(limit).await
    }
}

fn chat_output(response: ChatCompletionResponse) -> Result<ProviderOutput> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content.as_text())
        .ok_or_else(|| AppError::Provider("Provider response contained no message content".into()))?;
    let usage = response
        .usage
        .ok_or_else(|| AppError::Provider("Provider response is missing token usage".into()))?;

    Ok(ProviderOutput {
        record_text: text.clone(),
        response_text: text,
        tokens_used: Some(usage.total_tokens),
        image_urls: Vec::new(),
        revised_prompt: None,
    })
}

fn image_output(response: ImageGenerationResponse) -> Result<ProviderOutput> {
    let revised_prompt = response
        .data
        .first()
        .and_then(|image| image.revised_prompt.clone());
    let image_urls: Vec<String> = response
        .data
        .into_iter()
        .filter_map(|image| image.url)
        .collect();

    if image_urls.is_empty() {
        return Err(AppError::Provider(
            "Provider response contained no image URLs".into(),
        ));
    }

    let count = image_urls.len();
    Ok(ProviderOutput {
        record_text: format!("Generated {} image(s)", count),
        response_text: format!("Successfully generated {} image(s)", count),
        tokens_used: None,
        image_urls,
        revised_prompt,
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
