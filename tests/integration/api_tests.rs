//! API endpoint integration tests

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use genai_gateway::{
    api::routes::create_router,
    backend::OpenAiProvider,
    config::Settings,
    storage::{MemoryGenerationStore, MemoryUsageStore},
    AppState,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_provider() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Hello from the model" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 4, "completion_tokens": 6, "total_tokens": 10 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "url": "https://img.example.com/1.png" }]
        })))
        .mount(&server)
        .await;
    server
}

fn app(server: &MockServer, limit: u32) -> (Router, Arc<AppState>) {
    let mut settings = Settings::default();
    settings.rate_limit.requests_per_window = limit;
    settings.provider.base_url = server.uri();
    settings.provider.api_key = Some("test-key".to_string());
    settings.provider.timeout_ms = 2000;

    let provider = Arc::new(OpenAiProvider::new(&settings.provider).unwrap());
    let state = Arc::new(AppState::new(
        settings,
        provider,
        Arc::new(MemoryGenerationStore::new()),
        Arc::new(MemoryUsageStore::new()),
    ));
    (create_router(state.clone()), state)
}

fn post_json(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header("X-User-ID", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = mock_provider().await;
    let (app, _) = app(&server, 5);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "UP");
    assert_eq!(body["rateLimitEnabled"], true);
}

#[tokio::test]
async fn test_generate_returns_envelope_and_quota_headers() {
    let server = mock_provider().await;
    let (app, _) = app(&server, 5);

    let response = app
        .oneshot(post_json("/v1/ai/generate", Some("alice"), json!({ "prompt": "hello" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "4");
    assert!(response.headers().contains_key("x-ratelimit-reset"));

    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["type"], "text");
    assert_eq!(body["output"], "Hello from the model");
    assert_eq!(body["tokensUsed"], 10);
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_blank_prompt_is_rejected_before_admission() {
    let server = mock_provider().await;
    let (app, state) = app(&server, 5);

    let response = app
        .oneshot(post_json("/v1/ai/summarize", Some("bob"), json!({ "prompt": "  " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.rate_limiter.remaining("bob"), 5);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Validation failed");
}

#[tokio::test]
async fn test_rate_limit_rejects_sixth_request() {
    let server = mock_provider().await;
    let (app, _) = app(&server, 5);

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(post_json("/v1/ai/generate", Some("carol"), json!({ "prompt": "hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post_json("/v1/ai/generate", Some("carol"), json!({ "prompt": "hi" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

    let body = json_body(response).await;
    assert_eq!(body["error"], "Rate limit exceeded");
    assert_eq!(body["remaining"], 0);

    // Another actor is unaffected
    let response = app
        .oneshot(post_json("/v1/ai/generate", Some("dave"), json!({ "prompt": "hi" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_body_user_id_used_without_header() {
    let server = mock_provider().await;
    let (app, state) = app(&server, 5);

    app.oneshot(post_json(
        "/v1/ai/creative",
        None,
        json!({ "prompt": "a poem", "userId": "erin" }),
    ))
    .await
    .unwrap();

    assert_eq!(state.rate_limiter.remaining("erin"), 4);
    assert_eq!(state.rate_limiter.remaining("anonymous"), 5);
}

#[tokio::test]
async fn test_conversations_and_record_lookup() {
    let server = mock_provider().await;
    let (app, _) = app(&server, 10);

    app.clone()
        .oneshot(post_json("/v1/ai/analyze", Some("frank"), json!({ "prompt": "text" })))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get("/v1/ai/conversations?user=frank"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let records = json_body(response).await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "success");
    assert_eq!(records[0]["actorId"], "frank");

    let id = records[0]["id"].as_u64().unwrap();
    let response = app
        .clone()
        .oneshot(get(&format!("/v1/ai/conversations/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/v1/ai/conversations/424242")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_image_generation_endpoint() {
    let server = mock_provider().await;
    let (app, _) = app(&server, 5);

    let response = app
        .oneshot(post_json(
            "/v1/image/generate",
            Some("gina"),
            json!({ "prompt": "a lighthouse" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["type"], "generation");
    assert_eq!(body["imageUrls"][0], "https://img.example.com/1.png");
}

#[tokio::test]
async fn test_image_analysis_rejects_blank_image() {
    let server = mock_provider().await;
    let (app, _) = app(&server, 5);

    let response = app
        .oneshot(post_json(
            "/v1/image/analyze",
            Some("hank"),
            json!({ "imageData": "" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

fn multipart_request(content_type: &str, file: &[u8]) -> Request<Body> {
    let boundary = "gatewayboundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"prompt\"\r\n\r\nDescribe it\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"pic\"\r\n\
             Content-Type: {ct}\r\n\r\n",
            b = boundary,
            ct = content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/v1/image/analyze/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header("X-User-ID", "ivy")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_upload_analysis() {
    let server = mock_provider().await;
    let (app, _) = app(&server, 5);

    let response = app
        .oneshot(multipart_request("image/png", &[0x89, b'P', b'N', b'G']))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["type"], "analysis");
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn test_upload_rejects_unsupported_type() {
    let server = mock_provider().await;
    let (app, state) = app(&server, 5);

    let response = app
        .oneshot(multipart_request("application/pdf", b"%PDF-1.4"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.rate_limiter.remaining("ivy"), 5);
}

#[tokio::test]
async fn test_stats_summary() {
    let server = mock_provider().await;
    let (app, _) = app(&server, 10);

    for user in ["jack", "jack", "kate"] {
        app.clone()
            .oneshot(post_json("/v1/ai/generate", Some(user), json!({ "prompt": "hi" })))
            .await
            .unwrap();
    }

    let response = app.clone().oneshot(get("/v1/stats/summary")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["totalRequests"], 3);
    assert_eq!(body["totalTokens"], 30);
    assert_eq!(body["period"], "7 days");
    assert_eq!(body["topUsers"][0]["actorId"], "jack");
    assert_eq!(body["topUsers"][0]["requests"], 2);

    let response = app.clone().oneshot(get("/v1/stats/user?user=kate")).await.unwrap();
    let rows = json_body(response).await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["requestsCount"], 1);
    assert_eq!(rows[0]["successfulRequests"], 1);

    let response = app.oneshot(get("/v1/stats/top-users?days=1")).await.unwrap();
    let top = json_body(response).await;
    assert_eq!(top.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_prompt_is_a_validation_error() {
    let server = mock_provider().await;
    let (app, state) = app(&server, 5);

    for body in [json!({ "model": "x" }), json!({ "prompt": null })] {
        let response = app
            .clone()
            .oneshot(post_json("/v1/ai/generate", Some("lena"), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["status"], 400);
    }
    assert_eq!(state.rate_limiter.remaining("lena"), 5);
}

#[tokio::test]
async fn test_malformed_image_request_is_a_validation_error() {
    let server = mock_provider().await;
    let (app, _) = app(&server, 5);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/image/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"prompt\": "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json("/v1/image/analyze", Some("milo"), json!({ "imageType": "url" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Validation failed");
}
