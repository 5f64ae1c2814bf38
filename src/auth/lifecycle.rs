//! Token lifecycle: issuance, rotation, invalidation.
//!
//! The only writer of an account's stored refresh token. Rotation is
//! single-use: the presented token is atomically replaced, so a replay
//! (or a concurrent duplicate) fails with `RefreshNotRecognized`.

use std::sync::Arc;

use crate::db::{Account, Database};
use crate::jwt::{IdentityClaim, JwtConfig};

use super::errors::AuthError;

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone)]
pub struct TokenLifecycle {
    db: Database,
    jwt: Arc<JwtConfig>,
}

impl TokenLifecycle {
    pub fn new(db: Database, jwt: Arc<JwtConfig>) -> Self {
        Self { db, jwt }
    }

    /// Issue a fresh pair for an account that just proved its identity
    /// (password or social sign-in). Overwrites any previous session's
    /// refresh token unconditionally.
    pub async fn issue_pair(&self, account: &Account) -> Result<TokenPair, AuthError> {
        let refresh = self.jwt.generate_refresh_token().map_err(AuthError::Jwt)?;
        self.db
            .accounts()
            .set_refresh_token(account.id, &refresh)
            .await
            .map_err(AuthError::Database)?;

        let access = self
            .jwt
            .generate_access_token(&IdentityClaim::for_account(account))
            .map_err(AuthError::Jwt)?;

        Ok(TokenPair { access, refresh })
    }

    /// Exchange a presented refresh token for a new pair.
    ///
    /// The stored value is replaced with a compare-and-set keyed on the
    /// presented token; when several requests race with the same token,
    /// exactly one wins and the rest fail with `RefreshNotRecognized`.
    /// After a successful rotation the presented token is permanently dead.
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, AuthError> {
        self.jwt
            .validate_refresh_token(presented)
            .map_err(|_| AuthError::TokenInvalid)?;

        let account = self
            .db
            .accounts()
            .find_by_refresh_token(presented)
            .await
            .map_err(AuthError::Database)?
            .ok_or(AuthError::RefreshNotRecognized)?;

        let refresh = self.jwt.generate_refresh_token().map_err(AuthError::Jwt)?;
        let swapped = self
            .db
            .accounts()
            .swap_refresh_token(presented, &refresh)
            .await
            .map_err(AuthError::Database)?;
        if !swapped {
            // A concurrent rotation replaced the stored value after the
            // lookup above; this attempt loses.
            return Err(AuthError::RefreshNotRecognized);
        }

        let access = self
            .jwt
            .generate_access_token(&IdentityClaim::for_account(&account))
            .map_err(AuthError::Jwt)?;

        Ok(TokenPair { access, refresh })
    }

    /// Drop the stored refresh token (logout, account deletion). The
    /// account's outstanding refresh token stops being exchangeable.
    pub async fn invalidate(&self, account_id: i64) -> Result<(), AuthError> {
        self.db
            .accounts()
            .clear_refresh_token(account_id)
            .await
            .map_err(AuthError::Database)?;
        Ok(())
    }
}
