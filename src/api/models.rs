//! API request and response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, Result};
use crate::gateway::{ImageInput, ImageSource, TextInput, VisionInput};
use crate::storage::ActorRequests;

const MAX_TEXT_PROMPT_CHARS: usize = 2000;
const MAX_IMAGE_PROMPT_CHARS: usize = 1000;
const MAX_IMAGES: u32 = 10;

/// Text generation request, shared by the generate/summarize/creative/analyze endpoints
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// The prompt to generate from
    pub prompt: String,

    /// Model override (uses the configured default if not specified)
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 - 2.0)
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Caller identity; the `X-User-ID` header takes precedence
    #[serde(default)]
    pub user_id: Option<String>,
}

impl GenerationRequest {
    pub fn validate(&self) -> Result<()> {
        validate_prompt(&self.prompt, MAX_TEXT_PROMPT_CHARS)?;
        validate_sampling(self.max_tokens, self.temperature)
    }

    pub fn into_input(self, actor_id: String) -> TextInput {
        TextInput {
            actor_id,
            prompt: self.prompt,
            model: self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Vision analysis request with an image URL or base64 payload
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisRequest {
    /// Image URL or base64 encoded image
    pub image_data: String,

    /// "url" (default) or "base64"
    #[serde(default)]
    pub image_type: Option<String>,

    /// Optional analysis prompt
    #[serde(default)]
    pub prompt: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub user_id: Option<String>,
}

impl ImageAnalysisRequest {
    pub fn validate(&self) -> Result<()> {
        if self.image_data.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "Image URL or base64 data cannot be blank".to_string(),
            ));
        }
        match self.image_type.as_deref() {
            None | Some("url") | Some("base64") => {}
            Some(other) => {
                return Err(AppError::InvalidRequest(format!(
                    "Unsupported imageType '{}', expected 'url' or 'base64'",
                    other
                )))
            }
        }
        if let Some(prompt) = &self.prompt {
            if prompt.chars().count() > MAX_TEXT_PROMPT_CHARS {
                return Err(AppError::InvalidRequest(format!(
                    "Prompt cannot exceed {} characters",
                    MAX_TEXT_PROMPT_CHARS
                )));
            }
        }
        validate_sampling(self.max_tokens, self.temperature)
    }

    pub fn into_input(self, actor_id: String) -> VisionInput {
        let image = match self.image_type.as_deref() {
            Some("base64") => ImageSource::Base64 {
                data: self.image_data,
                mime: None,
            },
            _ => ImageSource::Url(self.image_data),
        };

        VisionInput {
            actor_id,
            image,
            prompt: self.prompt,
            model: self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Image generation request
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageRequest {
    pub prompt: String,

    #[serde(default)]
    pub model: Option<String>,

    /// e.g. "1024x1024"
    #[serde(default)]
    pub size: Option<String>,

    /// "standard" or "hd"
    #[serde(default)]
    pub quality: Option<String>,

    /// "vivid" or "natural"
    #[serde(default)]
    pub style: Option<String>,

    /// Number of images to generate (1-10)
    #[serde(default)]
    pub n: Option<u32>,

    #[serde(default)]
    pub user_id: Option<String>,
}

impl GenerateImageRequest {
    pub fn validate(&self) -> Result<()> {
        validate_prompt(&self.prompt, MAX_IMAGE_PROMPT_CHARS)?;
        if let Some(n) = self.n {
            if n == 0 || n > MAX_IMAGES {
                return Err(AppError::InvalidRequest(format!(
                    "n must be between 1 and {}",
                    MAX_IMAGES
                )));
            }
        }
        Ok(())
    }

    pub fn into_input(self, actor_id: String) -> ImageInput {
        ImageInput {
            actor_id,
            prompt: self.prompt,
            model: self.model,
            n: self.n,
            size: self.size,
            quality: self.quality,
            style: self.style,
        }
    }
}

fn validate_prompt(prompt: &str, max_chars: usize) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(AppError::InvalidRequest("Prompt cannot be blank".to_string()));
    }
    if prompt.chars().count() > max_chars {
        return Err(AppError::InvalidRequest(format!(
            "Prompt cannot exceed {} characters",
            max_chars
        )));
    }
    Ok(())
}

fn validate_sampling(max_tokens: Option<u32>, temperature: Option<f32>) -> Result<()> {
    if max_tokens == Some(0) {
        return Err(AppError::InvalidRequest(
            "maxTokens must be at least 1".to_string(),
        ));
    }
    if let Some(t) = temperature {
        if !(0.0..=2.0).contains(&t) {
            return Err(AppError::InvalidRequest(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
    }
    Ok(())
}

/// Multipart form for image upload analysis
#[derive(Debug, ToSchema)]
pub struct UploadImageForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub prompt: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Actor to look up; defaults to the `X-User-ID` header, then "anonymous"
    pub user: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DaysQuery {
    /// Number of days to look back
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Aggregated usage over a period
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_requests: u64,
    pub total_tokens: u64,
    pub top_users: Vec<ActorRequests>,
    pub period: String,
}

/// Health check response
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub rate_limit_enabled: bool,
    pub tracked_actors: usize,
}
