use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::ApiAuth;
use crate::openai::OpenAiClient;

#[derive(Clone)]
pub struct TranslateState {
    /// None when no API key was configured; the endpoint then answers 503.
    pub translator: Option<Arc<OpenAiClient>>,
}

pub fn router(state: TranslateState) -> Router {
    Router::new()
        .route("/", post(translate))
        .with_state(state)
}

#[derive(Deserialize)]
struct TranslateRequest {
    text: String,
    target_lang: String,
}

#[derive(Serialize)]
struct TranslateResponse {
    translation: String,
}

async fn translate(
    State(state): State<TranslateState>,
    ApiAuth(_): ApiAuth,
    Json(payload): Json<TranslateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let translator = state
        .translator
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Translation is not configured"))?;

    let text = payload.text.trim();
    let target_lang = payload.target_lang.trim();

    if text.is_empty() {
        return Err(ApiError::bad_request("Text cannot be empty"));
    }
    if text.chars().count() > 1000 {
        return Err(ApiError::bad_request(
            "Text cannot be longer than 1000 characters",
        ));
    }

    if target_lang.is_empty() {
        return Err(ApiError::bad_request("Target language cannot be empty"));
    }
    if target_lang.chars().count() > 32 {
        return Err(ApiError::bad_request(
            "Target language cannot be longer than 32 characters",
        ));
    }

    let translation = translator
        .translate(text, target_lang)
        .await
        .upstream_err("Translation failed")?;

    Ok(Json(TranslateResponse { translation }))
}
