pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod google;
pub mod jwt;
pub mod mailer;
pub mod openai;
pub mod password;
pub mod rate_limit;

use api::create_api_router;
use auth::AuthSettings;
use axum::Router;
use axum::http::HeaderValue;
use db::Database;
use google::GoogleClient;
use jwt::JwtConfig;
use mailer::Mailer;
use openai::OpenAiClient;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_ttl: u64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl: u64,
    /// Header carrying the access token
    pub access_header: String,
    /// Header carrying the refresh token
    pub refresh_header: String,
    /// Path prefixes that skip authentication
    pub allow_prefixes: Vec<String>,
    /// Google OAuth client config; None disables social sign-in
    pub google: Option<google::GoogleConfig>,
    /// Translation API config; None disables the translation proxy
    pub translator: Option<openai::OpenAiConfig>,
    /// Verification code delivery channel
    pub mailer: Arc<dyn Mailer>,
    /// Header carrying the client IP when running behind a trusted proxy
    pub trusted_ip_header: Option<String>,
    /// Allowed CORS origins; empty means permissive
    pub cors_origins: Vec<String>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(
        &config.jwt_secret,
        config.access_ttl,
        config.refresh_ttl,
    ));

    let settings = Arc::new(
        AuthSettings::new(
            &config.access_header,
            &config.refresh_header,
            config.allow_prefixes.clone(),
        )
        .expect("Invalid token header name"),
    );

    let google = config.google.clone().map(|google_config| {
        Arc::new(GoogleClient::new(google_config).expect("Failed to build HTTP client"))
    });

    let translator = config.translator.clone().map(|openai_config| {
        Arc::new(OpenAiClient::new(openai_config).expect("Failed to build HTTP client"))
    });

    let trusted_ip_header = config
        .trusted_ip_header
        .as_deref()
        .map(|name| name.parse().expect("Invalid trusted IP header name"));
    let rate_limit_config = Arc::new(RateLimitConfig::new(trusted_ip_header));

    let api_router = create_api_router(
        config.db.clone(),
        jwt,
        settings.clone(),
        google,
        translator,
        config.mailer.clone(),
        rate_limit_config,
    );

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer(&config.cors_origins, &settings))
}

/// Build the CORS layer. The token headers are exposed so a browser
/// client can read issued pairs off login and rotation responses.
fn cors_layer(origins: &[String], settings: &AuthSettings) -> CorsLayer {
    let expose = [
        settings.access_header().clone(),
        settings.refresh_header().clone(),
    ];

    if origins.is_empty() {
        return CorsLayer::permissive().expose_headers(expose);
    }

    let mut allowed = Vec::new();
    for origin in origins {
        match origin.parse::<HeaderValue>() {
            Ok(value) => allowed.push(value),
            Err(_) => warn!(origin = %origin, "Ignoring invalid CORS origin"),
        }
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(expose)
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    // Run cleanup tasks on startup
    init_cleanup(&config.db).await;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
