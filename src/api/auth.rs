use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{ApiAuth, AuthSettings, BEARER_PREFIX, TokenLifecycle, TokenPair};
use crate::db::{Database, Provider, Role};
use crate::password;
use crate::rate_limit::{RateLimitConfig, rate_limit_auth};

#[derive(Clone)]
pub struct AuthRoutesState {
    pub db: Database,
    pub tokens: TokenLifecycle,
    pub settings: Arc<AuthSettings>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

pub fn router(state: AuthRoutesState) -> Router {
    let rate_limit_config = state.rate_limit_config.clone();
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            rate_limit_config,
            rate_limit_auth,
        ))
}

/// Put an issued pair into the configured token headers, bearer-prefixed.
pub(super) fn token_pair_headers(
    settings: &AuthSettings,
    pair: &TokenPair,
) -> Result<HeaderMap, ApiError> {
    let access = HeaderValue::from_str(&format!("{}{}", BEARER_PREFIX, pair.access))
        .internal_err("Failed to encode token header")?;
    let refresh = HeaderValue::from_str(&format!("{}{}", BEARER_PREFIX, pair.refresh))
        .internal_err("Failed to encode token header")?;

    let mut headers = HeaderMap::new();
    headers.insert(settings.access_header().clone(), access);
    headers.insert(settings.refresh_header().clone(), refresh);
    Ok(headers)
}

#[derive(Deserialize)]
struct RegisterRequest {
    local_id: String,
    password: String,
    nickname: String,
    email: Option<String>,
}

#[derive(Serialize)]
struct RegisterResponse {
    account_id: i64,
    local_id: String,
    nickname: String,
}

async fn register(
    State(state): State<AuthRoutesState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let local_id = payload.local_id.trim();
    let nickname = payload.nickname.trim();

    if local_id.len() < 4 {
        return Err(ApiError::bad_request(
            "Local ID must be at least 4 characters",
        ));
    }

    if local_id.len() > 32 {
        return Err(ApiError::bad_request(
            "Local ID cannot be longer than 32 characters",
        ));
    }

    // Only allow lowercase alphanumeric and underscores
    if !local_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Local ID can only contain lowercase letters, numbers, and underscores",
        ));
    }

    if payload.password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    if payload.password.len() > 128 {
        return Err(ApiError::bad_request(
            "Password cannot be longer than 128 characters",
        ));
    }

    // Chars, not bytes: nicknames are routinely non-ASCII
    let nickname_chars = nickname.chars().count();
    if nickname_chars < 2 {
        return Err(ApiError::bad_request(
            "Nickname must be at least 2 characters",
        ));
    }

    if nickname_chars > 24 {
        return Err(ApiError::bad_request(
            "Nickname cannot be longer than 24 characters",
        ));
    }

    let email = match payload.email.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(email) if email.contains('@') && email.len() <= 254 => Some(email),
        Some(_) => return Err(ApiError::bad_request("Invalid email address")),
    };

    let taken = state
        .db
        .accounts()
        .find_by_local_id(local_id)
        .await
        .db_err("Failed to check local ID availability")?;
    if taken.is_some() {
        return Err(ApiError::conflict("Local ID is already taken"));
    }

    let taken = state
        .db
        .accounts()
        .find_by_nickname(nickname)
        .await
        .db_err("Failed to check nickname availability")?;
    if taken.is_some() {
        return Err(ApiError::conflict("Nickname is already taken"));
    }

    if let Some(email) = email {
        let taken = state
            .db
            .accounts()
            .find_by_email_and_provider(email, Provider::Local)
            .await
            .db_err("Failed to check email availability")?;
        if taken.is_some() {
            return Err(ApiError::conflict("Email is already registered"));
        }
    }

    let password_hash =
        password::hash_password(&payload.password).internal_err("Failed to hash password")?;

    let account_id = state
        .db
        .accounts()
        .create_local(local_id, &password_hash, nickname, email)
        .await
        .db_err("Failed to create account")?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            account_id,
            local_id: local_id.to_string(),
            nickname: nickname.to_string(),
        }),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    local_id: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    account_id: i64,
    nickname: String,
    role: Role,
}

async fn login(
    State(state): State<AuthRoutesState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let local_id = payload.local_id.trim();

    // Same message for unknown ID and wrong password
    let account = state
        .db
        .accounts()
        .find_by_local_id(local_id)
        .await
        .db_err("Failed to look up account")?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let stored_hash = account
        .password_hash
        .as_deref()
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let verified = password::verify_password(&payload.password, stored_hash)
        .internal_err("Failed to verify password")?;
    if !verified {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let pair = state
        .tokens
        .issue_pair(&account)
        .await
        .internal_err("Failed to issue tokens")?;
    let headers = token_pair_headers(&state.settings, &pair)?;

    Ok((
        headers,
        Json(LoginResponse {
            account_id: account.id,
            nickname: account.nickname,
            role: account.role,
        }),
    ))
}

async fn logout(
    State(state): State<AuthRoutesState>,
    ApiAuth(principal): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    state
        .tokens
        .invalidate(principal.account_id)
        .await
        .internal_err("Failed to invalidate session")?;

    Ok(StatusCode::NO_CONTENT)
}
