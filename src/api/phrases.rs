use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ResultExt};
use crate::auth::{AdminAuth, ApiAuth};
use crate::db::{Database, Phrase, PhraseStatus, Role};

#[derive(Clone)]
pub struct PhrasesState {
    pub db: Database,
}

pub fn router(state: PhrasesState) -> Router {
    Router::new()
        .route("/", post(create_phrase))
        .route("/search", get(search_phrases))
        .route("/mine", get(my_phrases))
        .route("/pending", get(pending_phrases))
        .route("/{id}/approve", post(approve_phrase))
        .route("/{id}/reject", post(reject_phrase))
        .route("/{id}", delete(delete_phrase))
        .with_state(state)
}

#[derive(Serialize)]
pub(super) struct PhraseResponse {
    id: i64,
    author_id: i64,
    source_text: String,
    target_text: String,
    tag: String,
    status: PhraseStatus,
    reject_reason: Option<String>,
    created_at: String,
}

impl From<Phrase> for PhraseResponse {
    fn from(phrase: Phrase) -> Self {
        Self {
            id: phrase.id,
            author_id: phrase.author_id,
            source_text: phrase.source_text,
            target_text: phrase.target_text,
            tag: phrase.tag,
            status: phrase.status,
            reject_reason: phrase.reject_reason,
            created_at: phrase.created_at,
        }
    }
}

pub(super) fn phrase_list(phrases: Vec<Phrase>) -> Json<Vec<PhraseResponse>> {
    Json(phrases.into_iter().map(PhraseResponse::from).collect())
}

#[derive(Deserialize)]
struct CreatePhraseRequest {
    source_text: String,
    target_text: String,
    tag: String,
}

// Lengths are counted in characters, not bytes: phrase text is
// multilingual and multi-byte scripts are the common case.
fn validate_text(value: &str, field: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{} cannot be empty", field)));
    }
    if value.chars().count() > 500 {
        return Err(ApiError::bad_request(format!(
            "{} cannot be longer than 500 characters",
            field
        )));
    }
    Ok(())
}

async fn create_phrase(
    State(state): State<PhrasesState>,
    ApiAuth(principal): ApiAuth,
    Json(payload): Json<CreatePhraseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let source_text = payload.source_text.trim();
    let target_text = payload.target_text.trim();
    let tag = payload.tag.trim();

    validate_text(source_text, "Source text")?;
    validate_text(target_text, "Target text")?;

    if tag.is_empty() {
        return Err(ApiError::bad_request("Tag cannot be empty"));
    }
    if tag.chars().count() > 32 {
        return Err(ApiError::bad_request(
            "Tag cannot be longer than 32 characters",
        ));
    }

    let id = state
        .db
        .phrases()
        .create(principal.account_id, source_text, target_text, tag)
        .await
        .db_err("Failed to create phrase")?;

    let phrase = state
        .db
        .phrases()
        .get(id)
        .await
        .db_err("Failed to load phrase")?
        .ok_or_else(|| ApiError::internal("Phrase vanished after creation"))?;

    Ok((StatusCode::CREATED, Json(PhraseResponse::from(phrase))))
}

#[derive(Deserialize)]
struct SearchParams {
    tag: Option<String>,
}

/// Public browse endpoint: approved phrases only.
async fn search_phrases(
    State(state): State<PhrasesState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = params.tag.as_deref().map(str::trim).filter(|t| !t.is_empty());

    let phrases = state
        .db
        .phrases()
        .list_approved(tag)
        .await
        .db_err("Failed to search phrases")?;

    Ok(phrase_list(phrases))
}

async fn my_phrases(
    State(state): State<PhrasesState>,
    ApiAuth(principal): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let phrases = state
        .db
        .phrases()
        .list_by_author(principal.account_id)
        .await
        .db_err("Failed to list phrases")?;

    Ok(phrase_list(phrases))
}

async fn pending_phrases(
    State(state): State<PhrasesState>,
    AdminAuth(_): AdminAuth,
) -> Result<impl IntoResponse, ApiError> {
    let phrases = state
        .db
        .phrases()
        .list_pending()
        .await
        .db_err("Failed to list pending phrases")?;

    Ok(phrase_list(phrases))
}

async fn approve_phrase(
    State(state): State<PhrasesState>,
    AdminAuth(_): AdminAuth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let approved = state
        .db
        .phrases()
        .approve(id)
        .await
        .db_err("Failed to approve phrase")?;

    if !approved {
        return Err(ApiError::not_found("Phrase not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct RejectPhraseRequest {
    reason: String,
}

async fn reject_phrase(
    State(state): State<PhrasesState>,
    AdminAuth(_): AdminAuth,
    Path(id): Path<i64>,
    Json(payload): Json<RejectPhraseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reason = payload.reason.trim();

    if reason.is_empty() {
        return Err(ApiError::bad_request("Reason cannot be empty"));
    }
    if reason.chars().count() > 200 {
        return Err(ApiError::bad_request(
            "Reason cannot be longer than 200 characters",
        ));
    }

    let rejected = state
        .db
        .phrases()
        .reject(id, reason)
        .await
        .db_err("Failed to reject phrase")?;

    if !rejected {
        return Err(ApiError::not_found("Phrase not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn delete_phrase(
    State(state): State<PhrasesState>,
    ApiAuth(principal): ApiAuth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let phrase = state
        .db
        .phrases()
        .get(id)
        .await
        .db_err("Failed to get phrase")?
        .ok_or_else(|| ApiError::not_found("Phrase not found"))?;

    // Only allow the author or an admin to delete
    let is_author = phrase.author_id == principal.account_id;
    let is_admin = principal.role == Role::Admin;

    if !is_author && !is_admin {
        return Err(ApiError::forbidden("You can only delete your own phrases"));
    }

    let deleted = state
        .db
        .phrases()
        .delete(id)
        .await
        .db_err("Failed to delete phrase")?;

    if !deleted {
        return Err(ApiError::not_found("Phrase not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
