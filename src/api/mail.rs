use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
};
use rand::{Rng, distr::Alphanumeric};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::db::Database;
use crate::mailer::Mailer;
use crate::rate_limit::{RateLimitConfig, rate_limit_auth};

#[derive(Clone)]
pub struct MailState {
    pub db: Database,
    pub mailer: Arc<dyn Mailer>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

pub fn router(state: MailState) -> Router {
    let rate_limit_config = state.rate_limit_config.clone();
    Router::new()
        .route("/request", post(request_code))
        .route("/verify", post(verify_code))
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            rate_limit_config,
            rate_limit_auth,
        ))
}

const CODE_LENGTH: usize = 6;

fn generate_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() || !email.contains('@') || email.len() > 254 {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(())
}

#[derive(Deserialize)]
struct RequestCodeRequest {
    email: String,
}

/// Issue a fresh code for the address. A re-request overwrites any earlier
/// code. The response never reveals whether the address is registered.
async fn request_code(
    State(state): State<MailState>,
    Json(payload): Json<RequestCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim();
    validate_email(email)?;

    let code = generate_code();

    state
        .db
        .verifications()
        .store(email, &code)
        .await
        .db_err("Failed to store verification code")?;

    state.mailer.send_verification_code(email, &code);

    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
struct VerifyCodeRequest {
    email: String,
    code: String,
}

/// One-shot check: a matching unexpired code is consumed on success, so a
/// second attempt with the same code fails.
async fn verify_code(
    State(state): State<MailState>,
    Json(payload): Json<VerifyCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim();
    validate_email(email)?;

    let code = payload.code.trim();
    if code.len() != CODE_LENGTH {
        return Err(ApiError::bad_request("Invalid or expired code"));
    }

    let consumed = state
        .db
        .verifications()
        .consume(email, code)
        .await
        .db_err("Failed to verify code")?;

    // Same message for wrong, expired, and already-used codes
    if !consumed {
        return Err(ApiError::bad_request("Invalid or expired code"));
    }

    Ok(StatusCode::NO_CONTENT)
}
