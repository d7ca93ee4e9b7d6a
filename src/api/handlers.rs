//! Text generation, conversation history and health handlers

use crate::api::models::{GenerationRequest, HealthResponse, LimitQuery, UserQuery};
use crate::error::{AppError, Result};
use crate::gateway::{resolve_actor, GenerationResponse, TextVariant};
use crate::storage::GenerationRecord;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub const USER_ID_HEADER: &str = "x-user-id";

const DEFAULT_RECENT_LIMIT: usize = 10;

/// JSON body whose decoding failures surface as validation errors
pub type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

/// Caller identity from the `X-User-ID` header, if present
pub fn header_actor(headers: &HeaderMap) -> Option<&str> {
    headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok())
}

/// Count one request against the actor's window, or reject it
pub fn admit(state: &AppState, actor: &str) -> Result<()> {
    if state.rate_limiter.is_allowed(actor) {
        Ok(())
    } else {
        Err(AppError::RateLimited {
            remaining: state.rate_limiter.remaining(actor),
            reset_time: state.rate_limiter.reset_time(actor),
        })
    }
}

/// Wrap a generation response with the actor's remaining quota
pub fn with_quota_headers(state: &AppState, actor: &str, body: GenerationResponse) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-ratelimit-remaining",
        HeaderValue::from(state.rate_limiter.remaining(actor)),
    );
    if let Some(reset) = state.rate_limiter.reset_time(actor) {
        if let Ok(value) = HeaderValue::from_str(&reset.to_rfc3339()) {
            headers.insert("x-ratelimit-reset", value);
        }
    }
    (headers, Json(body)).into_response()
}

async fn run_text(
    state: Arc<AppState>,
    headers: HeaderMap,
    body: JsonBody<GenerationRequest>,
    variant: TextVariant,
) -> Result<Response> {
    let Json(request) = body?;
    request.validate()?;

    let actor = resolve_actor([header_actor(&headers), request.user_id.as_deref()]);
    info!(actor = %actor, variant = ?variant, "Received text generation request");

    admit(&state, &actor)?;

    let response = state
        .orchestrator
        .generate_text(variant, request.into_input(actor.clone()))
        .await;

    Ok(with_quota_headers(&state, &actor, response))
}

/// Generate text from a prompt
#[utoipa::path(
    post,
    path = "/v1/ai/generate",
    tag = "AI Generation",
    request_body = GenerationRequest,
    params(("X-User-ID" = Option<String>, Header, description = "Caller identity")),
    responses(
        (status = 200, description = "Generation finished; check `status` for the outcome", body = GenerationResponse),
        (status = 400, description = "Invalid request"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn generate_text(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: JsonBody<GenerationRequest>,
) -> Result<Response> {
    run_text(state, headers, body, TextVariant::Direct).await
}

/// Summarize the given text
#[utoipa::path(
    post,
    path = "/v1/ai/summarize",
    tag = "AI Generation",
    request_body = GenerationRequest,
    params(("X-User-ID" = Option<String>, Header, description = "Caller identity")),
    responses(
        (status = 200, description = "Generation finished", body = GenerationResponse),
        (status = 400, description = "Invalid request"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn summarize_text(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: JsonBody<GenerationRequest>,
) -> Result<Response> {
    run_text(state, headers, body, TextVariant::Summarize).await
}

/// Creative writing from a prompt
#[utoipa::path(
    post,
    path = "/v1/ai/creative",
    tag = "AI Generation",
    request_body = GenerationRequest,
    params(("X-User-ID" = Option<String>, Header, description = "Caller identity")),
    responses(
        (status = 200, description = "Generation finished", body = GenerationResponse),
        (status = 400, description = "Invalid request"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn creative_text(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: JsonBody<GenerationRequest>,
) -> Result<Response> {
    run_text(state, headers, body, TextVariant::Creative).await
}

/// Analyze tone, themes and insights of the given text
#[utoipa::path(
    post,
    path = "/v1/ai/analyze",
    tag = "AI Generation",
    request_body = GenerationRequest,
    params(("X-User-ID" = Option<String>, Header, description = "Caller identity")),
    responses(
        (status = 200, description = "Generation finished", body = GenerationResponse),
        (status = 400, description = "Invalid request"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn analyze_text(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: JsonBody<GenerationRequest>,
) -> Result<Response> {
    run_text(state, headers, body, TextVariant::Analyze).await
}

/// Generation history for an actor, newest first
#[utoipa::path(
    get,
    path = "/v1/ai/conversations",
    tag = "AI Generation",
    params(UserQuery, ("X-User-ID" = Option<String>, Header, description = "Caller identity")),
    responses((status = 200, description = "Generation records", body = [GenerationRecord]))
)]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<GenerationRecord>>> {
    let actor = resolve_actor([query.user.as_deref(), header_actor(&headers)]);
    info!(actor = %actor, "Retrieving conversations");

    Ok(Json(state.orchestrator.history(&actor).await?))
}

/// Single generation record
#[utoipa::path(
    get,
    path = "/v1/ai/conversations/{id}",
    tag = "AI Generation",
    params(("id" = u64, Path, description = "Generation record id")),
    responses(
        (status = 200, description = "Generation record", body = GenerationRecord),
        (status = 404, description = "No such record")
    )
)]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<GenerationRecord>> {
    Ok(Json(state.orchestrator.record(id).await?))
}

/// Most recent successful generations across all actors
#[utoipa::path(
    get,
    path = "/v1/ai/recent",
    tag = "AI Generation",
    params(LimitQuery),
    responses((status = 200, description = "Generation records", body = [GenerationRecord]))
)]
pub async fn recent_conversations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<GenerationRecord>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Ok(Json(state.orchestrator.recent_successful(limit).await?))
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        rate_limit_enabled: state.rate_limiter.is_enabled(),
        tracked_actors: state.rate_limiter.tracked_actors(),
    })
}
