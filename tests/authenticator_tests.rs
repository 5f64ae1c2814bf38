//! Tests for the request authenticator and the auth extractors.
//!
//! Tests cover:
//! - Allow-listed paths reaching their handlers without any token
//! - Uniform 401 for missing, malformed, expired, and orphaned access tokens
//! - Refresh tokens presented in the access slot being rejected
//! - Admin-only routes and live role resolution

mod common;

use axum::http::StatusCode;
use common::*;
use lingonest::jwt::JwtConfig;
use serde_json::json;

// =============================================================================
// Allow-list
// =============================================================================

#[tokio::test]
async fn test_search_is_public() {
    let (app, _db) = create_test_app().await;

    let response = send(&app, empty_request("GET", "/api/phrases/search")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_email_routes_are_public() {
    let (app, _db) = create_test_app().await;

    // A validation error, not a 401: the handler ran
    let response = send(
        &app,
        json_request("POST", "/api/email/request", &json!({"email": "nope"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oauth_route_is_public() {
    let (app, _db) = create_test_app().await;

    // Social sign-in is not configured in this app, so the handler
    // answers 503 rather than the authenticator answering 401
    let response = send(
        &app,
        json_request("POST", "/api/oauth/google", &json!({"code": "abc"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_phrase_listing_outside_search_requires_auth() {
    let (app, _db) = create_test_app().await;

    let response = send(&app, empty_request("GET", "/api/phrases/mine")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Access token failures collapse to 401
// =============================================================================

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (app, _db) = create_test_app().await;

    let response = send(&app, empty_request("GET", "/api/accounts/me")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Not authenticated");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let (app, _db) = create_test_app().await;

    let response = send(
        &app,
        authed_request("GET", "/api/accounts/me", "not-a-token"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Not authenticated");
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice_01", "Alice").await;

    let response = send(
        &app,
        authed_request(
            "GET",
            "/api/accounts/me",
            &expired_access_token(session.account_id),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_deleted_account_is_unauthorized() {
    let (app, db) = create_test_app().await;
    let session = register_and_login(&app, "alice_01", "Alice").await;

    assert!(db.accounts().delete(session.account_id).await.unwrap());

    // The token still verifies, but its identity resolves to nothing
    let response = send(
        &app,
        authed_request("GET", "/api/accounts/me", &session.access),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_in_access_slot_is_unauthorized() {
    let (app, _db) = create_test_app().await;
    register_and_login(&app, "alice_01", "Alice").await;

    let jwt = JwtConfig::new(TEST_JWT_SECRET, ACCESS_TTL, REFRESH_TTL);
    let refresh = jwt.generate_refresh_token().unwrap();

    let response = send(&app, authed_request("GET", "/api/accounts/me", &refresh)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_value_is_unauthorized() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice_01", "Alice").await;

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/accounts/me")
        .header(ACCESS_HEADER, session.access.clone())
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/accounts/me")
        .header(ACCESS_HEADER, format!("bearer {}", session.access))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let (app, db) = create_test_app().await;
    register_and_login(&app, "alice_01", "Alice").await;
    let account = db
        .accounts()
        .find_by_local_id("alice_01")
        .await
        .unwrap()
        .unwrap();

    let other = JwtConfig::new(b"a-completely-different-signing-key", ACCESS_TTL, REFRESH_TTL);
    let forged = other
        .generate_access_token(&lingonest::jwt::IdentityClaim::Local {
            account_id: account.id,
        })
        .unwrap();

    let response = send(&app, authed_request("GET", "/api/accounts/me", &forged)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Admin authorization
// =============================================================================

#[tokio::test]
async fn test_admin_route_rejects_plain_users() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice_01", "Alice").await;

    let response = send(
        &app,
        authed_request("GET", "/api/phrases/pending", &session.access),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Insufficient permissions");
}

#[tokio::test]
async fn test_admin_route_rejects_anonymous() {
    let (app, _db) = create_test_app().await;

    let response = send(&app, empty_request("GET", "/api/phrases/pending")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_change_applies_to_outstanding_tokens() {
    let (app, db) = create_test_app().await;
    let session = register_and_login(&app, "alice_01", "Alice").await;

    let response = send(
        &app,
        authed_request("GET", "/api/phrases/pending", &session.access),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    make_admin(&db, session.account_id).await;

    // The principal is resolved from the directory on every request, so
    // the same token now carries admin rights
    let response = send(
        &app,
        authed_request("GET", "/api/phrases/pending", &session.access),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
