#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Request, Response, StatusCode},
};
use lingonest::auth::TokenLifecycle;
use lingonest::db::{Database, Role};
use lingonest::jwt::JwtConfig;
use lingonest::mailer::Mailer;
use lingonest::{ServerConfig, create_app};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &[u8] = b"test-jwt-secret-that-is-long-enough";
pub const TEST_PASSWORD: &str = "correct horse battery";

pub const ACCESS_HEADER: &str = "authorization";
pub const REFRESH_HEADER: &str = "authorization-refresh";

pub const ACCESS_TTL: u64 = 3600;
pub const REFRESH_TTL: u64 = 14 * 24 * 3600;

/// Mailer that records issued codes instead of delivering them.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl Mailer for RecordingMailer {
    fn send_verification_code(&self, email: &str, code: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), code.to_string()));
    }
}

impl RecordingMailer {
    /// The most recently issued code for an address.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(e, _)| e == email)
            .map(|(_, code)| code.clone())
    }
}

pub fn default_allow_prefixes() -> Vec<String> {
    [
        "/api/auth/login",
        "/api/auth/register",
        "/api/oauth",
        "/api/email",
        "/api/phrases/search",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Base config for tests: in-memory database, recording mailer, no social
/// sign-in or translation.
pub async fn test_config() -> (ServerConfig, Database, Arc<RecordingMailer>) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let mailer = Arc::new(RecordingMailer::default());
    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: TEST_JWT_SECRET.to_vec(),
        access_ttl: ACCESS_TTL,
        refresh_ttl: REFRESH_TTL,
        access_header: "Authorization".to_string(),
        refresh_header: "Authorization-Refresh".to_string(),
        allow_prefixes: default_allow_prefixes(),
        google: None,
        translator: None,
        mailer: mailer.clone(),
        trusted_ip_header: None,
        cors_origins: Vec::new(),
    };
    (config, db, mailer)
}

/// Build the router from a config, with a fixed peer address so rate
/// limiting sees a client IP.
pub fn build_app(config: &ServerConfig) -> Router {
    create_app(config).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 3000))))
}

/// Serve a router on an OS-assigned port, standing in for an outside
/// service. The task is dropped with the runtime at the end of the test.
pub async fn start_stub_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().expect("Failed to get stub address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{}", addr)
}

pub async fn create_test_app() -> (Router, Database) {
    let (config, db, _mailer) = test_config().await;
    (build_app(&config), db)
}

/// Send one request through the app. Routers are cheap to clone.
pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("Request failed")
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// Read a bearer token out of a response header, stripping the prefix.
pub fn header_token(response: &Response<Body>, name: &str) -> String {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Missing {} header", name))
        .to_str()
        .unwrap()
        .strip_prefix("Bearer ")
        .expect("Header value is not bearer-prefixed")
        .to_string()
}

pub struct Session {
    pub account_id: i64,
    pub access: String,
    pub refresh: String,
}

pub async fn register(
    app: &Router,
    local_id: &str,
    password: &str,
    nickname: &str,
) -> Response<Body> {
    send(
        app,
        json_request(
            "POST",
            "/api/auth/register",
            &json!({
                "local_id": local_id,
                "password": password,
                "nickname": nickname,
            }),
        ),
    )
    .await
}

pub async fn login(app: &Router, local_id: &str, password: &str) -> Response<Body> {
    send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            &json!({
                "local_id": local_id,
                "password": password,
            }),
        ),
    )
    .await
}

/// Register and log in a fresh local account, returning its issued pair.
pub async fn register_and_login(app: &Router, local_id: &str, nickname: &str) -> Session {
    let response = register(app, local_id, TEST_PASSWORD, nickname).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = login(app, local_id, TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);

    let access = header_token(&response, ACCESS_HEADER);
    let refresh = header_token(&response, REFRESH_HEADER);
    let body = body_json(response).await;
    Session {
        account_id: body["account_id"].as_i64().unwrap(),
        access,
        refresh,
    }
}

pub async fn make_admin(db: &Database, account_id: i64) {
    let updated = db
        .accounts()
        .set_role(account_id, Role::Admin)
        .await
        .expect("Failed to set role");
    assert!(updated);
}

/// Create a local account directly in the database. Its password hash is
/// junk, so tokens for it come from `issue_pair_for`.
pub async fn create_db_user(db: &Database, local_id: &str, nickname: &str) -> i64 {
    db.accounts()
        .create_local(local_id, "x", nickname, None)
        .await
        .unwrap()
}

/// Issue a token pair for an account directly, bypassing the login route.
/// Used for social accounts, which have no password to log in with.
pub async fn issue_pair_for(db: &Database, account_id: i64) -> (String, String) {
    let jwt = Arc::new(JwtConfig::new(TEST_JWT_SECRET, ACCESS_TTL, REFRESH_TTL));
    let lifecycle = TokenLifecycle::new(db.clone(), jwt);
    let account = db
        .accounts()
        .find_by_id(account_id)
        .await
        .unwrap()
        .expect("Account not found");
    let pair = lifecycle.issue_pair(&account).await.unwrap();
    (pair.access, pair.refresh)
}

/// Sign an access token with the test secret but an expiry in the past.
pub fn expired_access_token(account_id: i64) -> String {
    use jsonwebtoken::{EncodingKey, Header};

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = json!({
        "sub": "access",
        "account_id": account_id,
        "iat": now - 7200,
        "exp": now - 3600,
    });
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .unwrap()
}

/// Create a phrase through the API and approve it directly in the database.
pub async fn create_approved_phrase(
    app: &Router,
    db: &Database,
    session: &Session,
    source: &str,
    target: &str,
    tag: &str,
) -> i64 {
    let request = Request::builder()
        .method("POST")
        .uri("/api/phrases")
        .header("content-type", "application/json")
        .header(ACCESS_HEADER, bearer(&session.access))
        .body(Body::from(
            json!({
                "source_text": source,
                "target_text": target,
                "tag": tag,
            })
            .to_string(),
        ))
        .unwrap();
    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let id = body["id"].as_i64().unwrap();

    assert!(db.phrases().approve(id).await.unwrap());
    id
}

/// Request helper carrying only a refresh token.
pub fn refresh_request(method: &str, uri: &str, refresh: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(REFRESH_HEADER, bearer(refresh))
        .body(Body::empty())
        .unwrap()
}

/// Request helper carrying an access token.
pub fn authed_request(method: &str, uri: &str, access: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(ACCESS_HEADER, bearer(access))
        .body(Body::empty())
        .unwrap()
}

/// JSON request helper carrying an access token.
pub fn authed_json_request(method: &str, uri: &str, access: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header(ACCESS_HEADER, bearer(access))
        .body(Body::from(body.to_string()))
        .unwrap()
}
