//! Authenticated principal type.

use crate::db::{Account, Role};

/// The authenticated identity for one request. Built by the identity
/// resolver, carried in request extensions, and discarded when the
/// request ends; never persisted.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Resolved account ID
    pub account_id: i64,
    /// Stable display identity: email if the account has one, else local id
    pub username: String,
    /// Role for authorization decisions
    pub role: Role,
}

impl From<&Account> for Principal {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            username: account.username().to_string(),
            role: account.role,
        }
    }
}
