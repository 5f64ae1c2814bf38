use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ResultExt};
use crate::auth::ApiAuth;
use crate::db::{Account, Database, Provider, Role};
use crate::password;

#[derive(Clone)]
pub struct AccountsState {
    pub db: Database,
}

pub fn router(state: AccountsState) -> Router {
    Router::new()
        .route("/me", get(get_me).patch(update_me).delete(delete_me))
        .with_state(state)
}

#[derive(Serialize)]
struct AccountResponse {
    account_id: i64,
    local_id: Option<String>,
    nickname: String,
    email: Option<String>,
    provider: Provider,
    role: Role,
    created_at: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.id,
            local_id: account.local_id,
            nickname: account.nickname,
            email: account.email,
            provider: account.provider,
            role: account.role,
            created_at: account.created_at,
        }
    }
}

async fn get_me(
    State(state): State<AccountsState>,
    ApiAuth(principal): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .db
        .accounts()
        .find_by_id(principal.account_id)
        .await
        .db_err("Failed to load account")?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    Ok(Json(AccountResponse::from(account)))
}

#[derive(Deserialize)]
struct UpdateAccountRequest {
    nickname: Option<String>,
    password: Option<String>,
}

async fn update_me(
    State(state): State<AccountsState>,
    ApiAuth(principal): ApiAuth,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.nickname.is_none() && payload.password.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    let account = state
        .db
        .accounts()
        .find_by_id(principal.account_id)
        .await
        .db_err("Failed to load account")?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    // Validate both fields before writing either, so a rejected password
    // cannot leave a half-applied patch.
    let nickname = match payload.nickname.as_deref().map(str::trim) {
        None => None,
        Some(nickname) if nickname.chars().count() < 2 => {
            return Err(ApiError::bad_request(
                "Nickname must be at least 2 characters",
            ));
        }
        Some(nickname) if nickname.chars().count() > 24 => {
            return Err(ApiError::bad_request(
                "Nickname cannot be longer than 24 characters",
            ));
        }
        Some(nickname) => {
            let taken = state
                .db
                .accounts()
                .find_by_nickname(nickname)
                .await
                .db_err("Failed to check nickname availability")?;
            if taken.is_some_and(|other| other.id != account.id) {
                return Err(ApiError::conflict("Nickname is already taken"));
            }
            Some(nickname)
        }
    };

    let password_hash = match payload.password.as_deref() {
        None => None,
        Some(_) if account.provider != Provider::Local => {
            return Err(ApiError::bad_request(
                "Password can only be changed on local accounts",
            ));
        }
        Some(new_password) if new_password.len() < 8 => {
            return Err(ApiError::bad_request(
                "Password must be at least 8 characters",
            ));
        }
        Some(new_password) if new_password.len() > 128 => {
            return Err(ApiError::bad_request(
                "Password cannot be longer than 128 characters",
            ));
        }
        Some(new_password) => {
            Some(password::hash_password(new_password).internal_err("Failed to hash password")?)
        }
    };

    if let Some(nickname) = nickname {
        state
            .db
            .accounts()
            .update_nickname(account.id, nickname)
            .await
            .db_err("Failed to update nickname")?;
    }

    if let Some(password_hash) = password_hash {
        state
            .db
            .accounts()
            .update_password(account.id, &password_hash)
            .await
            .db_err("Failed to update password")?;
    }

    let updated = state
        .db
        .accounts()
        .find_by_id(account.id)
        .await
        .db_err("Failed to load account")?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    Ok(Json(AccountResponse::from(updated)))
}

async fn delete_me(
    State(state): State<AccountsState>,
    ApiAuth(principal): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .accounts()
        .delete(principal.account_id)
        .await
        .db_err("Failed to delete account")?;

    if !deleted {
        return Err(ApiError::not_found("Account not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
