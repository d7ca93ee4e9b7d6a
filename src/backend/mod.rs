//! Backend module - provider trait, HTTP client and wire types

pub mod provider;
pub mod types;

pub use provider::{GenerationProvider, OpenAiProvider};
pub use types::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ContentPart,
    GeneratedImage, ImageGenerationRequest, ImageGenerationResponse, ImageUrl, MessageContent,
    Usage,
};
