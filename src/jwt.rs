//! JWT token generation and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::{Account, Provider};

/// Token kind, carried in the `sub` claim. A refresh token presented where
/// an access token is expected (or vice versa) fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// The identity an access token speaks for. Exactly one shape per token:
/// a numeric account id for local accounts, or an (email, provider) pair
/// for social accounts. On the wire the variant fields appear as flat
/// claims (`account_id`, or `email` + `provider`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdentityClaim {
    Local { account_id: i64 },
    Social { email: String, provider: Provider },
}

impl IdentityClaim {
    /// The claim shape an account's tokens carry: the id shape for local
    /// accounts, the (email, provider) shape for social ones. Social
    /// accounts always have an email; if one is somehow missing the id
    /// shape still identifies the row.
    pub fn for_account(account: &Account) -> Self {
        match (account.provider, account.email.as_ref()) {
            (Provider::Local, _) | (_, None) => IdentityClaim::Local {
                account_id: account.id,
            },
            (provider, Some(email)) => IdentityClaim::Social {
                email: email.clone(),
                provider,
            },
        }
    }
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Token kind tag
    pub sub: TokenKind,
    /// Identity claim (flattened into the claim set)
    #[serde(flatten)]
    pub identity: IdentityClaim,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens. No identity: a refresh token is only
/// ever compared against the value stored for an account. The random
/// `jti` makes every issued token a distinct string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Token kind tag
    pub sub: TokenKind,
    /// Random token id
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret and token
    /// lifetimes in seconds.
    pub fn new(secret: &[u8], access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    /// Generate an access token carrying the given identity claim.
    pub fn generate_access_token(&self, identity: &IdentityClaim) -> Result<String, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| JwtError::TimeError)?
            .as_secs();

        let claims = AccessClaims {
            sub: TokenKind::Access,
            identity: identity.clone(),
            iat: now,
            exp: now + self.access_ttl_secs,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)
    }

    /// Generate a refresh token. Carries no identity claim.
    pub fn generate_refresh_token(&self) -> Result<String, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| JwtError::TimeError)?
            .as_secs();

        let claims = RefreshClaims {
            sub: TokenKind::Refresh,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.refresh_ttl_secs,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)
    }

    /// Validate and decode an access token. All failure modes (malformed,
    /// bad signature, expired, wrong kind) collapse to an error; claims are
    /// only returned from a fully valid token.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
                .map_err(JwtError::Decoding)?;

        if token_data.claims.sub != TokenKind::Access {
            return Err(JwtError::WrongTokenKind);
        }

        Ok(token_data.claims)
    }

    /// Validate and decode a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<RefreshClaims>(token, &self.decoding_key, &validation)
                .map_err(JwtError::Decoding)?;

        if token_data.claims.sub != TokenKind::Refresh {
            return Err(JwtError::WrongTokenKind);
        }

        Ok(token_data.claims)
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
    /// Wrong token kind (e.g., a refresh token where an access token is expected)
    WrongTokenKind,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::WrongTokenKind => write!(f, "Wrong token kind"),
        }
    }
}

impl std::error::Error for JwtError {}
