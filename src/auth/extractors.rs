//! Axum extractors for authenticated handlers.
//!
//! The middleware has already resolved the request's principal (or left it
//! absent); extractors only read request extensions, so every protected
//! endpoint rejects with the same 401 regardless of why authentication
//! failed upstream.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::db::Role;

use super::errors::ApiAuthError;
use super::types::Principal;

/// Extractor for endpoints that require an authenticated principal.
pub struct ApiAuth(pub Principal);

impl<S> FromRequestParts<S> for ApiAuth
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(ApiAuth)
            .ok_or(ApiAuthError::NotAuthenticated)
    }
}

/// Extractor for admin-only endpoints.
pub struct AdminAuth(pub Principal);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ApiAuth(principal) = ApiAuth::from_request_parts(parts, state).await?;
        if principal.role != Role::Admin {
            return Err(ApiAuthError::InsufficientRole);
        }
        Ok(AdminAuth(principal))
    }
}

/// Optional authentication extractor - never fails.
/// For endpoints that work both authenticated and unauthenticated.
pub struct MaybeAuth(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(parts.extensions.get::<Principal>().cloned()))
    }
}
