//! Normalized generation tasks and the per-variant rules that build them

use crate::config::ProviderConfig;

const SUMMARY_PREFIX: &str = "Please provide a concise summary of the following text:\n\n";
const CREATIVE_PREFIX: &str = "Be creative and imaginative in your response to: ";
const ANALYSIS_PREFIX: &str =
    "Please analyze the following text in detail, including tone, themes, and key insights:\n\n";
const DEFAULT_VISION_PROMPT: &str = "Please analyze this image in detail, describing what you see, \
     including objects, people, colors, composition, and any notable features.";

const DEFAULT_IMAGE_COUNT: u32 = 1;
const DEFAULT_IMAGE_SIZE: &str = "1024x1024";
const DEFAULT_IMAGE_QUALITY: &str = "standard";
const DEFAULT_IMAGE_STYLE: &str = "vivid";
const VISION_DETAIL: &str = "high";

/// Model and sampling defaults applied when the caller omits them
#[derive(Debug, Clone)]
pub struct TaskDefaults {
    pub text_model: String,
    pub vision_model: String,
    pub image_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl From<&ProviderConfig> for TaskDefaults {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            text_model: config.default_model.clone(),
            vision_model: config.vision_model.clone(),
            image_model: config.image_model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Caller input for the text variants
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    pub actor_id: String,
    pub prompt: String,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Where the image to analyze comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Url(String),
    Base64 { data: String, mime: Option<String> },
}

impl ImageSource {
    /// URL handed to the provider; base64 payloads become data URLs
    pub fn to_url(&self) -> String {
        match self {
            ImageSource::Url(url) => url.clone(),
            ImageSource::Base64 { data, mime } => format!(
                "data:{};base64,{}",
                mime.as_deref().unwrap_or("image/jpeg"),
                data
            ),
        }
    }
}

/// Caller input for vision analysis
#[derive(Debug, Clone)]
pub struct VisionInput {
    pub actor_id: String,
    pub image: ImageSource,
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Caller input for image generation
#[derive(Debug, Clone, Default)]
pub struct ImageInput {
    pub actor_id: String,
    pub prompt: String,
    pub model: Option<String>,
    pub n: Option<u32>,
    pub size: Option<String>,
    pub quality: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    pub n: u32,
    pub size: String,
    pub quality: String,
    pub style: String,
}

/// What the provider is asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    Text,
    Vision { image_url: String, detail: String },
    ImageGeneration(ImageOptions),
}

impl TaskKind {
    /// Response `type` label
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Text => "text",
            TaskKind::Vision { .. } => "analysis",
            TaskKind::ImageGeneration(_) => "generation",
        }
    }

    /// Prefix for caller-facing error messages
    pub fn failure_message(&self) -> &'static str {
        match self {
            TaskKind::Text => "Failed to generate AI response",
            TaskKind::Vision { .. } => "Failed to analyze image",
            TaskKind::ImageGeneration(_) => "Failed to generate image",
        }
    }
}

/// Text generation flavours sharing one execution path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextVariant {
    Direct,
    Summarize,
    Creative,
    Analyze,
}

/// Normalized parameter bundle handed to the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTask {
    pub actor_id: String,
    pub prompt: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub kind: TaskKind,
}

impl GenerationTask {
    /// Apply a text variant's prompt transform and forced parameters
    pub fn text(variant: TextVariant, input: TextInput, defaults: &TaskDefaults) -> Self {
        let (prompt, max_tokens, temperature) = match variant {
            TextVariant::Direct => (
                input.prompt,
                input.max_tokens.unwrap_or(defaults.max_tokens),
                input.temperature.unwrap_or(defaults.temperature),
            ),
            TextVariant::Summarize => (format!("{}{}", SUMMARY_PREFIX, input.prompt), 300, 0.3),
            TextVariant::Creative => (
                format!("{}{}", CREATIVE_PREFIX, input.prompt),
                input.max_tokens.unwrap_or(800),
                0.9,
            ),
            TextVariant::Analyze => (
                format!("{}{}", ANALYSIS_PREFIX, input.prompt),
                input.max_tokens.unwrap_or(600),
                0.2,
            ),
        };

        Self {
            actor_id: input.actor_id,
            prompt,
            model: input.model.unwrap_or_else(|| defaults.text_model.clone()),
            max_tokens: Some(max_tokens),
            temperature: Some(temperature),
            kind: TaskKind::Text,
        }
    }

    pub fn vision(input: VisionInput, defaults: &TaskDefaults) -> Self {
        let prompt = input
            .prompt
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_VISION_PROMPT.to_string());

        Self {
            actor_id: input.actor_id,
            prompt,
            model: input.model.unwrap_or_else(|| defaults.vision_model.clone()),
            max_tokens: Some(input.max_tokens.unwrap_or(defaults.max_tokens)),
            temperature: Some(input.temperature.unwrap_or(defaults.temperature)),
            kind: TaskKind::Vision {
                image_url: input.image.to_url(),
                detail: VISION_DETAIL.to_string(),
            },
        }
    }

    pub fn image_generation(input: ImageInput, defaults: &TaskDefaults) -> Self {
        let options = ImageOptions {
            n: input.n.unwrap_or(DEFAULT_IMAGE_COUNT),
            size: input.size.unwrap_or_else(|| DEFAULT_IMAGE_SIZE.to_string()),
            quality: input.quality.unwrap_or_else(|| DEFAULT_IMAGE_QUALITY.to_string()),
            style: input.style.unwrap_or_else(|| DEFAULT_IMAGE_STYLE.to_string()),
        };

        Self {
            actor_id: input.actor_id,
            prompt: input.prompt,
            model: input.model.unwrap_or_else(|| defaults.image_model.clone()),
            max_tokens: None,
            temperature: None,
            kind: TaskKind::ImageGeneration(options),
        }
    }

    /// Prompt as stored on the generation record
    pub fn record_prompt(&self) -> String {
        match &self.kind {
            TaskKind::Text => self.prompt.clone(),
            TaskKind::Vision { .. } => format!("Image analysis: {}", self.prompt),
            TaskKind::ImageGeneration(_) => format!("Image generation: {}", self.prompt),
        }
    }
}
