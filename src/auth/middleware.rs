//! Per-request authentication middleware.
//!
//! Runs ahead of every API handler and decides which path applies:
//! allow-listed requests pass straight through; a request carrying a
//! refresh token is a token exchange and never reaches a handler; anything
//! else is resolved from its access token when possible and otherwise
//! continues unauthenticated, leaving rejection to the extractors.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::db::Database;
use crate::jwt::JwtConfig;

use super::bearer::{BEARER_PREFIX, bearer_token};
use super::errors::{AuthError, RefreshRejection};
use super::lifecycle::{TokenLifecycle, TokenPair};
use super::resolver::resolve_identity;
use super::types::Principal;

/// Token header names and the public-path allow-list.
pub struct AuthSettings {
    access_header: HeaderName,
    refresh_header: HeaderName,
    allowlist: Vec<String>,
}

impl AuthSettings {
    pub fn new(
        access_header: &str,
        refresh_header: &str,
        allowlist: Vec<String>,
    ) -> Result<Self, axum::http::header::InvalidHeaderName> {
        Ok(Self {
            access_header: access_header.parse()?,
            refresh_header: refresh_header.parse()?,
            allowlist,
        })
    }

    pub fn access_header(&self) -> &HeaderName {
        &self.access_header
    }

    pub fn refresh_header(&self) -> &HeaderName {
        &self.refresh_header
    }

    fn is_allowlisted(&self, path: &str) -> bool {
        self.allowlist.iter().any(|prefix| path.starts_with(prefix))
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub settings: Arc<AuthSettings>,
}

/// The request authenticator. Installed with
/// `middleware::from_fn_with_state` on the API router.
pub async fn authenticate(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    if state.settings.is_allowlisted(request.uri().path()) {
        return next.run(request).await;
    }

    // A refresh token short-circuits the request: clients only attach one
    // once the access token has expired, so this is a token exchange, not
    // a business request.
    if let Some(refresh) = bearer_token(request.headers(), &state.settings.refresh_header) {
        let lifecycle = TokenLifecycle::new(state.db.clone(), state.jwt.clone());
        return match lifecycle.rotate(refresh).await {
            Ok(pair) => rotation_response(&state.settings, &pair),
            Err(e) => RefreshRejection(e).into_response(),
        };
    }

    match access_principal(&state, request.headers()).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
        }
        Err(AuthError::Database(e)) => {
            tracing::error!("Authentication lookup failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        // Absent, invalid, and unresolvable access tokens all collapse to
        // an unauthenticated pass-through; protected handlers answer 401.
        Err(_) => {}
    }

    next.run(request).await
}

/// Validate the access token and resolve it to a principal.
///
/// Takes the header map rather than the whole request: `Body` is not
/// `Sync`, so holding `&Request` across an await would make the
/// authenticator's future non-`Send`.
async fn access_principal(
    state: &AuthState,
    headers: &axum::http::HeaderMap,
) -> Result<Principal, AuthError> {
    let token = bearer_token(headers, &state.settings.access_header)
        .ok_or(AuthError::Unauthenticated)?;
    let claims = state
        .jwt
        .validate_access_token(token)
        .map_err(|_| AuthError::TokenInvalid)?;
    resolve_identity(&state.db, &claims.identity)
        .await
        .map_err(AuthError::Database)?
        .ok_or(AuthError::IdentityNotFound)
}

/// Build the rotation response: the new pair in the configured headers,
/// bearer-prefixed, with no body.
fn rotation_response(settings: &AuthSettings, pair: &TokenPair) -> Response {
    let access = HeaderValue::from_str(&format!("{}{}", BEARER_PREFIX, pair.access));
    let refresh = HeaderValue::from_str(&format!("{}{}", BEARER_PREFIX, pair.refresh));
    let (Ok(access), Ok(refresh)) = (access, refresh) else {
        tracing::error!("Issued token is not a valid header value");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let mut response = StatusCode::OK.into_response();
    let headers = response.headers_mut();
    headers.insert(settings.access_header.clone(), access);
    headers.insert(settings.refresh_header.clone(), refresh);
    response
}
