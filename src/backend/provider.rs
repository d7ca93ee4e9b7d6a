//! External generation provider client (OpenAI API compatible)

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};

use crate::backend::types::{
    ChatCompletionRequest, ChatCompletionResponse, ImageGenerationRequest, ImageGenerationResponse,
};
use crate::config::ProviderConfig;
use crate::error::{AppError, Result};

/// Third-party generation API
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Text and vision chat completion
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse>;

    /// Image generation
    async fn generate_images(&self, request: ImageGenerationRequest) -> Result<ImageGenerationResponse>;
}

/// Provider speaking the OpenAI REST shape over one shared client
pub struct OpenAiProvider {
    name: String,
    base_url: String,
    client: Client,
    api_key: Option<String>,
}

impl OpenAiProvider {
    /// Create a provider; the configured timeout bounds both connect and response
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            warn!(base_url = %config.base_url, "No provider API key configured");
        }

        Ok(Self {
            name: "openai".to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            api_key,
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.api_key {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Provider returned {}: {}",
                status, body
            )));
        }

        response.json::<R>().await.map_err(|e| {
            error!(provider = %self.name, url = %url, error = %e, "Failed to parse provider response");
            AppError::Provider(format!("Failed to parse response: {}", e))
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        debug!(provider = %self.name, model = %request.model, "Sending chat completion request");
        self.post("/chat/completions", &request).await
    }

    async fn generate_images(&self, request: ImageGenerationRequest) -> Result<ImageGenerationResponse> {
        debug!(provider = %self.name, model = %request.model, n = request.n, "Sending image generation request");
        self.post("/images/generations", &request).await
    }
}
