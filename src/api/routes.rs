//! HTTP route definitions

use crate::api::models::*;
use crate::api::{handlers, image_handlers, stats_handlers};
use crate::gateway::{GenerationResponse, ResponseStatus};
use crate::storage::{ActorRequests, GenerationRecord, GenerationStatus, UsageAggregate};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for multipart framing and the other form fields around the file
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "GenAI Gateway API",
        version = "0.1.0",
        description = "Rate-limited gateway for text generation, image analysis and image generation with usage accounting.",
        license(name = "MIT"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        handlers::generate_text,
        handlers::summarize_text,
        handlers::creative_text,
        handlers::analyze_text,
        handlers::list_conversations,
        handlers::get_conversation,
        handlers::recent_conversations,
        handlers::health_check,
        image_handlers::analyze_image,
        image_handlers::analyze_uploaded_image,
        image_handlers::generate_image,
        stats_handlers::user_stats,
        stats_handlers::recent_stats,
        stats_handlers::summary,
        stats_handlers::top_users,
    ),
    components(schemas(
        GenerationRequest,
        ImageAnalysisRequest,
        GenerateImageRequest,
        UploadImageForm,
        GenerationResponse,
        ResponseStatus,
        GenerationRecord,
        GenerationStatus,
        UsageAggregate,
        ActorRequests,
        StatsSummary,
        HealthResponse,
    )),
    tags(
        (name = "AI Generation", description = "Text generation endpoints"),
        (name = "Image", description = "Image analysis and generation endpoints"),
        (name = "Statistics", description = "Usage statistics endpoints"),
        (name = "Health", description = "Health and monitoring endpoints"),
    )
)]
pub struct ApiDoc;

/// Create the main application router
pub fn create_router(state: Arc<crate::AppState>) -> Router {
    let body_limit = state.settings.image.max_file_size + MULTIPART_OVERHEAD;

    let ai_routes = Router::new()
        .route("/generate", post(handlers::generate_text))
        .route("/summarize", post(handlers::summarize_text))
        .route("/creative", post(handlers::creative_text))
        .route("/analyze", post(handlers::analyze_text))
        .route("/conversations", get(handlers::list_conversations))
        .route("/conversations/:id", get(handlers::get_conversation))
        .route("/recent", get(handlers::recent_conversations));

    let image_routes = Router::new()
        .route("/analyze", post(image_handlers::analyze_image))
        .route("/analyze/upload", post(image_handlers::analyze_uploaded_image))
        .route("/generate", post(image_handlers::generate_image));

    let stats_routes = Router::new()
        .route("/user", get(stats_handlers::user_stats))
        .route("/recent", get(stats_handlers::recent_stats))
        .route("/summary", get(stats_handlers::summary))
        .route("/top-users", get(stats_handlers::top_users));

    Router::new()
        // Health check endpoint (not rate limited)
        .route("/health", get(handlers::health_check))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/v1/ai", ai_routes)
        .nest("/v1/image", image_routes)
        .nest("/v1/stats", stats_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
