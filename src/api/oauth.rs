use axum::{
    Json, Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::token_pair_headers;
use super::error::{ApiError, ResultExt};
use crate::auth::{AuthSettings, TokenLifecycle};
use crate::db::{Account, Database, Provider, Role};
use crate::google::GoogleClient;
use crate::rate_limit::{RateLimitConfig, rate_limit_auth};

#[derive(Clone)]
pub struct OauthState {
    pub db: Database,
    pub tokens: TokenLifecycle,
    pub settings: Arc<AuthSettings>,
    /// None when no client credentials were configured; the endpoint then
    /// answers 503 instead of failing partway through an exchange.
    pub google: Option<Arc<GoogleClient>>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

pub fn router(state: OauthState) -> Router {
    let rate_limit_config = state.rate_limit_config.clone();
    Router::new()
        .route("/google", post(google_login))
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            rate_limit_config,
            rate_limit_auth,
        ))
}

#[derive(Deserialize)]
struct GoogleLoginRequest {
    code: String,
}

#[derive(Serialize)]
struct GoogleLoginResponse {
    account_id: i64,
    nickname: String,
    role: Role,
}

async fn google_login(
    State(state): State<OauthState>,
    Json(payload): Json<GoogleLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Social sign-in is not configured"))?;

    let code = payload.code.trim();
    if code.is_empty() {
        return Err(ApiError::bad_request("Authorization code cannot be empty"));
    }

    let profile = google
        .exchange_code(code)
        .await
        .upstream_err("Google sign-in failed")?;

    let account = match state
        .db
        .accounts()
        .find_by_email_and_provider(&profile.email, Provider::Google)
        .await
        .db_err("Failed to look up account")?
    {
        Some(account) => account,
        None => provision_account(&state.db, &profile.email, profile.name.as_deref()).await?,
    };

    let pair = state
        .tokens
        .issue_pair(&account)
        .await
        .internal_err("Failed to issue tokens")?;
    let headers = token_pair_headers(&state.settings, &pair)?;

    Ok((
        headers,
        Json(GoogleLoginResponse {
            account_id: account.id,
            nickname: account.nickname,
            role: account.role,
        }),
    ))
}

/// First sign-in: create the account row. The nickname comes from the
/// profile name (or the email local part), with a numeric suffix on
/// collision.
async fn provision_account(
    db: &Database,
    email: &str,
    name: Option<&str>,
) -> Result<Account, ApiError> {
    let base = nickname_base(email, name);
    let nickname = available_nickname(db, &base)
        .await
        .db_err("Failed to pick a nickname")?;

    let account_id = db
        .accounts()
        .create_social(email, Provider::Google, &nickname)
        .await
        .db_err("Failed to create account")?;

    db.accounts()
        .find_by_id(account_id)
        .await
        .db_err("Failed to load account")?
        .ok_or_else(|| ApiError::internal("Account vanished after creation"))
}

fn nickname_base(email: &str, name: Option<&str>) -> String {
    let raw = match name.map(str::trim) {
        Some(name) if name.chars().count() >= 2 => name,
        _ => email.split('@').next().unwrap_or(""),
    };

    // Leave room for a collision suffix under the 24-char nickname cap
    let base: String = raw.chars().take(20).collect();
    let base = base.trim();
    if base.chars().count() < 2 {
        "speaker".to_string()
    } else {
        base.to_string()
    }
}

async fn available_nickname(db: &Database, base: &str) -> Result<String, sqlx::Error> {
    if db.accounts().find_by_nickname(base).await?.is_none() {
        return Ok(base.to_string());
    }

    for n in 2..1000 {
        let candidate = format!("{}{}", base, n);
        if db.accounts().find_by_nickname(&candidate).await?.is_none() {
            return Ok(candidate);
        }
    }

    // Practically unreachable; fall back to a random suffix
    Ok(format!("{}-{}", base, &uuid::Uuid::new_v4().to_string()[..8]))
}
