//! Image analysis and image generation handlers

use crate::api::handlers::{admit, header_actor, with_quota_headers, JsonBody};
use crate::api::models::{GenerateImageRequest, ImageAnalysisRequest, UploadImageForm};
use crate::error::{AppError, Result};
use crate::gateway::{resolve_actor, GenerationResponse, ImageSource, VisionInput};
use crate::AppState;
use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::Response,
    Json,
};
use base64::Engine;
use std::sync::Arc;
use tracing::{debug, info};

/// Analyze an image given by URL or base64 payload
#[utoipa::path(
    post,
    path = "/v1/image/analyze",
    tag = "Image",
    request_body = ImageAnalysisRequest,
    params(("X-User-ID" = Option<String>, Header, description = "Caller identity")),
    responses(
        (status = 200, description = "Analysis finished; check `status` for the outcome", body = GenerationResponse),
        (status = 400, description = "Invalid request"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn analyze_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: JsonBody<ImageAnalysisRequest>,
) -> Result<Response> {
    let Json(request) = body?;
    request.validate()?;

    let actor = resolve_actor([header_actor(&headers), request.user_id.as_deref()]);
    info!(actor = %actor, image_type = ?request.image_type, "Received image analysis request");

    admit(&state, &actor)?;

    let response = state
        .orchestrator
        .analyze_image(request.into_input(actor.clone()))
        .await;

    Ok(with_quota_headers(&state, &actor, response))
}

/// Analyze an uploaded image file
#[utoipa::path(
    post,
    path = "/v1/image/analyze/upload",
    tag = "Image",
    request_body(content = UploadImageForm, content_type = "multipart/form-data"),
    params(("X-User-ID" = Option<String>, Header, description = "Caller identity")),
    responses(
        (status = 200, description = "Analysis finished; check `status` for the outcome", body = GenerationResponse),
        (status = 400, description = "Missing, oversized or unsupported file"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn analyze_uploaded_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut file: Option<(Vec<u8>, String)> = None;
    let mut prompt = None;
    let mut model = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidRequest(format!("Failed to read file: {}", e)))?;
                file = Some((bytes.to_vec(), content_type));
            }
            "prompt" => prompt = Some(read_text(field).await?),
            "model" => model = Some(read_text(field).await?),
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let (bytes, content_type) =
        file.ok_or_else(|| AppError::InvalidRequest("File is required".to_string()))?;
    validate_upload(&state, &bytes, &content_type)?;

    let actor = resolve_actor([header_actor(&headers)]);
    info!(
        actor = %actor,
        size = bytes.len(),
        content_type = %content_type,
        "Received image upload for analysis"
    );

    admit(&state, &actor)?;

    let input = VisionInput {
        actor_id: actor.clone(),
        image: ImageSource::Base64 {
            data: base64::engine::general_purpose::STANDARD.encode(&bytes),
            mime: Some(content_type),
        },
        prompt: prompt.filter(|p: &String| !p.trim().is_empty()),
        model: model.filter(|m: &String| !m.trim().is_empty()),
        max_tokens: None,
        temperature: None,
    };

    let response = state.orchestrator.analyze_image(input).await;
    Ok(with_quota_headers(&state, &actor, response))
}

/// Generate images from a prompt
#[utoipa::path(
    post,
    path = "/v1/image/generate",
    tag = "Image",
    request_body = GenerateImageRequest,
    params(("X-User-ID" = Option<String>, Header, description = "Caller identity")),
    responses(
        (status = 200, description = "Generation finished; check `status` for the outcome", body = GenerationResponse),
        (status = 400, description = "Invalid request"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: JsonBody<GenerateImageRequest>,
) -> Result<Response> {
    let Json(request) = body?;
    request.validate()?;

    let actor = resolve_actor([header_actor(&headers), request.user_id.as_deref()]);
    info!(actor = %actor, n = ?request.n, size = ?request.size, "Received image generation request");

    admit(&state, &actor)?;

    let response = state
        .orchestrator
        .generate_image(request.into_input(actor.clone()))
        .await;

    Ok(with_quota_headers(&state, &actor, response))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Malformed form field: {}", e)))
}

fn validate_upload(state: &AppState, bytes: &[u8], content_type: &str) -> Result<()> {
    let limits = &state.settings.image;

    if bytes.is_empty() {
        return Err(AppError::InvalidRequest("File is empty".to_string()));
    }
    if !limits.is_allowed_type(content_type) {
        return Err(AppError::InvalidRequest(format!(
            "Unsupported file type '{}'. Allowed types: {}",
            content_type,
            limits.allowed_types.join(", ")
        )));
    }
    if bytes.len() > limits.max_file_size {
        return Err(AppError::InvalidRequest(format!(
            "File size exceeds maximum allowed size of {} MB",
            limits.max_file_size / (1024 * 1024)
        )));
    }
    Ok(())
}
