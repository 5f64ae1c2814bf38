//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::google::{self, GoogleConfig};
use crate::mailer::LogMailer;
use crate::openai::{self, OpenAiConfig};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_allow_prefixes() -> Vec<String> {
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

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Lingonest",
    about = "Community phrasebook with token authentication"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "lingonest.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, default_value = "3600")]
    pub access_ttl: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, default_value = "1209600")]
    pub refresh_ttl: u64,

    /// Header carrying the access token
    #[arg(long, default_value = "Authorization")]
    pub access_header: String,

    /// Header carrying the refresh token
    #[arg(long, default_value = "Authorization-Refresh")]
    pub refresh_header: String,

    /// Path prefix that skips authentication (repeatable)
    #[arg(long = "allow-prefix", default_values_t = default_allow_prefixes())]
    pub allow_prefixes: Vec<String>,

    /// Google OAuth client ID (enables social sign-in)
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// Google OAuth client secret
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub google_client_secret: Option<String>,

    /// Public base URL, used to derive the OAuth redirect URI
    #[arg(long, default_value = "http://localhost:8080")]
    pub public_base_url: String,

    /// Translation API key (enables the translation proxy)
    #[arg(long, env = "TRANSLATION_API_KEY", hide_env_values = true)]
    pub translation_api_key: Option<String>,

    /// Translation API base URL
    #[arg(long, default_value = openai::DEFAULT_BASE_URL)]
    pub translation_base_url: String,

    /// Translation model
    #[arg(long, default_value = openai::DEFAULT_MODEL)]
    pub translation_model: String,

    /// Header carrying the client IP when running behind a trusted proxy
    /// (e.g. X-Forwarded-For)
    #[arg(long)]
    pub trusted_ip_header: Option<String>,

    /// Allowed CORS origin (repeatable; permissive when none given)
    #[arg(long = "cors-origin")]
    pub cors_origins: Vec<String>,

    /// Promote the account with this local ID to admin on startup
    #[arg(long)]
    pub promote_admin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Parse and validate the public base URL.
/// Returns None and logs an error if validation fails.
pub fn validate_public_base_url(public_base_url: &str) -> Option<Url> {
    let url = match Url::parse(public_base_url) {
        Ok(url) => url,
        Err(e) => {
            error!(url = %public_base_url, error = %e, "Invalid public base URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_localhost = url.host_str() == Some("localhost");

    if !is_https && !is_localhost {
        error!("Public base URL must use HTTPS for non-localhost deployments");
        return None;
    }

    Some(url)
}

/// Handle the --promote-admin flag: grant the admin role to an existing
/// local account.
pub async fn handle_promote_admin(db: &Database, local_id: &str) {
    match db.accounts().find_by_local_id(local_id).await {
        Ok(Some(account)) => match db
            .accounts()
            .set_role(account.id, crate::db::Role::Admin)
            .await
        {
            Ok(_) => info!(local_id = %local_id, "Account promoted to admin"),
            Err(e) => {
                error!(local_id = %local_id, error = %e, "Failed to promote account");
                std::process::exit(1);
            }
        },
        Ok(None) => {
            error!(local_id = %local_id, "No account with this local ID; register it first");
            std::process::exit(1);
        }
        Err(e) => {
            error!(local_id = %local_id, error = %e, "Failed to look up account");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String, public_base_url: &Url) -> ServerConfig {
    let google = match (&args.google_client_id, &args.google_client_secret) {
        (Some(client_id), Some(client_secret)) => {
            let redirect_uri = public_base_url
                .join("oauth/google/callback")
                .map(String::from)
                .unwrap_or_else(|_| format!("{}oauth/google/callback", public_base_url));
            Some(GoogleConfig {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                redirect_uri,
                token_url: google::DEFAULT_TOKEN_URL.to_string(),
                userinfo_url: google::DEFAULT_USERINFO_URL.to_string(),
            })
        }
        (None, None) => None,
        _ => {
            warn!("Google client ID and secret must both be set; social sign-in disabled");
            None
        }
    };

    let translator = args.translation_api_key.as_ref().map(|api_key| OpenAiConfig {
        api_key: api_key.clone(),
        base_url: args.translation_base_url.clone(),
        model: args.translation_model.clone(),
    });

    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        access_ttl: args.access_ttl,
        refresh_ttl: args.refresh_ttl,
        access_header: args.access_header.clone(),
        refresh_header: args.refresh_header.clone(),
        allow_prefixes: args.allow_prefixes.clone(),
        google,
        translator,
        mailer: Arc::new(LogMailer),
        trusted_ip_header: args.trusted_ip_header.clone(),
        cors_origins: args.cors_origins.clone(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
