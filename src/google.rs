//! Google OAuth authorization-code exchange.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Client credentials plus endpoint URLs. The URLs are configurable so
/// tests can point the exchange at a local mock server.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_url: String,
    pub userinfo_url: String,
}

#[derive(Debug)]
pub enum GoogleError {
    Request(reqwest::Error),
    TokenStatus(reqwest::StatusCode),
    UserinfoStatus(reqwest::StatusCode),
    MissingEmail,
}

impl std::fmt::Display for GoogleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoogleError::Request(e) => write!(f, "Google request failed: {}", e),
            GoogleError::TokenStatus(status) => {
                write!(f, "Google token endpoint returned {}", status)
            }
            GoogleError::UserinfoStatus(status) => {
                write!(f, "Google userinfo endpoint returned {}", status)
            }
            GoogleError::MissingEmail => write!(f, "Google profile has no email"),
        }
    }
}

impl std::error::Error for GoogleError {}

/// The profile fields the account directory needs.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserinfoResponse {
    email: Option<String>,
    name: Option<String>,
}

#[derive(Clone)]
pub struct GoogleClient {
    http: Client,
    config: GoogleConfig,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { http, config })
    }

    /// Exchange an authorization code for the owner's profile: code for
    /// access token at the token endpoint, then access token for profile
    /// at the userinfo endpoint.
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleProfile, GoogleError> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(GoogleError::Request)?;
        if !response.status().is_success() {
            return Err(GoogleError::TokenStatus(response.status()));
        }
        let token: TokenResponse = response.json().await.map_err(GoogleError::Request)?;

        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(GoogleError::Request)?;
        if !response.status().is_success() {
            return Err(GoogleError::UserinfoStatus(response.status()));
        }
        let profile: UserinfoResponse = response.json().await.map_err(GoogleError::Request)?;

        let email = profile
            .email
            .filter(|email| !email.is_empty())
            .ok_or(GoogleError::MissingEmail)?;

        Ok(GoogleProfile {
            email,
            name: profile.name,
        })
    }
}
