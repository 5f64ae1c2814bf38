use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use super::error::{ApiError, ResultExt};
use super::phrases::phrase_list;
use crate::auth::ApiAuth;
use crate::db::{Database, PhraseStatus};

#[derive(Clone)]
pub struct BookmarksState {
    pub db: Database,
}

pub fn router(state: BookmarksState) -> Router {
    Router::new()
        .route("/", get(list_bookmarks))
        .route("/{phrase_id}", post(add_bookmark).delete(remove_bookmark))
        .with_state(state)
}

async fn add_bookmark(
    State(state): State<BookmarksState>,
    ApiAuth(principal): ApiAuth,
    Path(phrase_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let phrase = state
        .db
        .phrases()
        .get(phrase_id)
        .await
        .db_err("Failed to get phrase")?
        .ok_or_else(|| ApiError::not_found("Phrase not found"))?;

    if phrase.status != PhraseStatus::Approved {
        return Err(ApiError::bad_request(
            "Only approved phrases can be bookmarked",
        ));
    }

    let added = state
        .db
        .bookmarks()
        .add(principal.account_id, phrase_id)
        .await
        .db_err("Failed to add bookmark")?;

    if !added {
        return Err(ApiError::conflict("Phrase is already bookmarked"));
    }

    Ok(StatusCode::CREATED)
}

async fn remove_bookmark(
    State(state): State<BookmarksState>,
    ApiAuth(principal): ApiAuth,
    Path(phrase_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .db
        .bookmarks()
        .remove(principal.account_id, phrase_id)
        .await
        .db_err("Failed to remove bookmark")?;

    if !removed {
        return Err(ApiError::not_found("Bookmark not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn list_bookmarks(
    State(state): State<BookmarksState>,
    ApiAuth(principal): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let phrases = state
        .db
        .bookmarks()
        .list_for_account(principal.account_id)
        .await
        .db_err("Failed to list bookmarks")?;

    Ok(phrase_list(phrases))
}
