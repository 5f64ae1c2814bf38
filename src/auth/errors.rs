//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::jwt::JwtError;

/// Outcomes of the authentication core. The first four are per-request
/// semantic outcomes; `Database` and `Jwt` are infrastructure failures.
#[derive(Debug)]
pub enum AuthError {
    /// Bad signature, malformed, or expired. Never disambiguated further.
    TokenInvalid,
    /// The refresh token verified but no account currently holds it:
    /// logged out, deleted, or already rotated.
    RefreshNotRecognized,
    /// A valid access token whose claimed identity no longer exists.
    IdentityNotFound,
    /// No usable token on the request.
    Unauthenticated,
    /// Account directory failure.
    Database(sqlx::Error),
    /// Token generation failure.
    Jwt(JwtError),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::TokenInvalid => write!(f, "Invalid or expired token"),
            AuthError::RefreshNotRecognized => write!(f, "Refresh token not recognized"),
            AuthError::IdentityNotFound => write!(f, "Identity not found"),
            AuthError::Unauthenticated => write!(f, "Not authenticated"),
            AuthError::Database(e) => write!(f, "Database error: {}", e),
            AuthError::Jwt(e) => write!(f, "Token error: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Response for a failed refresh exchange. A refresh attempt is an explicit
/// re-authentication act, so unlike access-token failures it is answered
/// immediately with a structured 403 body.
#[derive(Debug)]
pub struct RefreshRejection(pub AuthError);

impl IntoResponse for RefreshRejection {
    fn into_response(self) -> Response {
        let (status, error) = match self.0 {
            AuthError::TokenInvalid => (StatusCode::FORBIDDEN, "Invalid refresh token"),
            AuthError::RefreshNotRecognized => {
                (StatusCode::FORBIDDEN, "Refresh token not recognized")
            }
            AuthError::Database(ref e) => {
                tracing::error!("Refresh rotation failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
            AuthError::Jwt(ref e) => {
                tracing::error!("Refresh rotation failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
            _ => (StatusCode::FORBIDDEN, "Refresh rejected"),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

/// Rejections produced by the authentication extractors.
#[derive(Debug)]
pub enum ApiAuthError {
    NotAuthenticated,
    InsufficientRole,
}

impl ApiAuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiAuthError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ApiAuthError::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ApiAuthError::NotAuthenticated => "Not authenticated",
            ApiAuthError::InsufficientRole => "Insufficient permissions",
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorBody {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
