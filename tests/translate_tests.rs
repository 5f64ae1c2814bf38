//! Tests for the translation proxy.
//!
//! The chat-completion endpoint is stubbed with a local server; the config
//! points the proxy at it.
//!
//! Tests cover:
//! - Proxying a completion back as the translation
//! - The outbound request shape (model, system prompt, user text)
//! - Input validation and authentication
//! - Upstream failures surfacing as 502, unconfigured proxy as 503

mod common;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use common::*;
use lingonest::openai::OpenAiConfig;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// Stub completion endpoint answering with fixed content and recording the
/// request body it saw.
fn completion_stub(content: &str, seen: Arc<Mutex<Option<Value>>>) -> Router {
    let content = content.to_string();
    Router::new()
        .route(
            "/v1/chat/completions",
            post(move |State(seen): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| {
                let content = content.clone();
                async move {
                    *seen.lock().unwrap() = Some(body);
                    Json(json!({
                        "choices": [
                            { "message": { "role": "assistant", "content": content } }
                        ]
                    }))
                }
            }),
        )
        .with_state(seen)
}

fn translator_config(base: &str) -> OpenAiConfig {
    OpenAiConfig {
        api_key: "test-key".to_string(),
        base_url: base.to_string(),
        model: "test-model".to_string(),
    }
}

/// App wired to a stub translator, plus the recorded outbound request.
async fn app_with_translator(content: &str) -> (axum::Router, Arc<Mutex<Option<Value>>>) {
    let seen = Arc::new(Mutex::new(None));
    let base = start_stub_server(completion_stub(content, seen.clone())).await;
    let (mut config, _db, _mailer) = test_config().await;
    config.translator = Some(translator_config(&base));
    (build_app(&config), seen)
}

fn translate_body(text: &str, target_lang: &str) -> Value {
    json!({ "text": text, "target_lang": target_lang })
}

// =============================================================================
// Proxying
// =============================================================================

#[tokio::test]
async fn test_translate_returns_completion_content() {
    let (app, _seen) = app_with_translator("  Hallo Welt  ").await;
    let session = register_and_login(&app, "alice_01", "Alice").await;

    let response = send(
        &app,
        authed_json_request(
            "POST",
            "/api/translate",
            &session.access,
            &translate_body("Hello world", "German"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Whitespace around the completion is stripped
    let body = body_json(response).await;
    assert_eq!(body["translation"], "Hallo Welt");
}

#[tokio::test]
async fn test_translate_sends_model_and_prompt_upstream() {
    let (app, seen) = app_with_translator("Hallo").await;
    let session = register_and_login(&app, "alice_01", "Alice").await;

    let response = send(
        &app,
        authed_json_request(
            "POST",
            "/api/translate",
            &session.access,
            &translate_body("Hello", "German"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let request = seen.lock().unwrap().clone().expect("Stub saw no request");
    assert_eq!(request["model"], "test-model");

    let messages = request["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert!(
        messages[0]["content"]
            .as_str()
            .unwrap()
            .contains("German")
    );
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "Hello");
}

// =============================================================================
// Validation and authentication
// =============================================================================

#[tokio::test]
async fn test_translate_requires_auth() {
    let (app, _seen) = app_with_translator("Hallo").await;

    let response = send(
        &app,
        json_request("POST", "/api/translate", &translate_body("Hello", "German")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_translate_validates_input() {
    let (app, _seen) = app_with_translator("Hallo").await;
    let session = register_and_login(&app, "alice_01", "Alice").await;

    let cases = [
        translate_body("", "German"),
        translate_body(&"x".repeat(1001), "German"),
        translate_body("Hello", ""),
        translate_body("Hello", &"x".repeat(33)),
    ];
    for body in cases {
        let response = send(
            &app,
            authed_json_request("POST", "/api/translate", &session.access, &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{:?}", body);
    }
}

#[tokio::test]
async fn test_translate_accepts_multibyte_text_at_limit() {
    // 1000 characters, far more than 1000 bytes
    let text = "あ".repeat(1000);
    let (app, _seen) = app_with_translator("Ah").await;
    let session = register_and_login(&app, "alice_01", "Alice").await;

    let response = send(
        &app,
        authed_json_request(
            "POST",
            "/api/translate",
            &session.access,
            &translate_body(&text, "English"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Failure modes
// =============================================================================

#[tokio::test]
async fn test_translate_unavailable_without_key() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice_01", "Alice").await;

    let response = send(
        &app,
        authed_json_request(
            "POST",
            "/api/translate",
            &session.access,
            &translate_body("Hello", "German"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Translation is not configured");
}

#[tokio::test]
async fn test_upstream_failure_maps_to_bad_gateway() {
    let stub = Router::new().route(
        "/v1/chat/completions",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let base = start_stub_server(stub).await;

    let (mut config, _db, _mailer) = test_config().await;
    config.translator = Some(translator_config(&base));
    let app = build_app(&config);
    let session = register_and_login(&app, "alice_01", "Alice").await;

    let response = send(
        &app,
        authed_json_request(
            "POST",
            "/api/translate",
            &session.access,
            &translate_body("Hello", "German"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Translation failed");
}

#[tokio::test]
async fn test_empty_completion_maps_to_bad_gateway() {
    let stub = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({ "choices": [] })) }),
    );
    let base = start_stub_server(stub).await;

    let (mut config, _db, _mailer) = test_config().await;
    config.translator = Some(translator_config(&base));
    let app = build_app(&config);
    let session = register_and_login(&app, "alice_01", "Alice").await;

    let response = send(
        &app,
        authed_json_request(
            "POST",
            "/api/translate",
            &session.access,
            &translate_body("Hello", "German"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
