mod accounts;
mod auth;
mod bookmarks;
mod error;
mod mail;
mod oauth;
mod phrases;
mod translate;

use axum::{Router, middleware};
use std::sync::Arc;

use crate::auth::{AuthSettings, AuthState, TokenLifecycle, authenticate};
use crate::db::Database;
use crate::google::GoogleClient;
use crate::jwt::JwtConfig;
use crate::mailer::Mailer;
use crate::openai::OpenAiClient;
use crate::rate_limit::{RateLimitConfig, rate_limit_general};

/// Create the API router.
///
/// Every route lives behind the authenticator middleware; the allow-list
/// in `settings` decides which paths skip it.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    settings: Arc<AuthSettings>,
    google: Option<Arc<GoogleClient>>,
    translator: Option<Arc<OpenAiClient>>,
    mailer: Arc<dyn Mailer>,
    rate_limit_config: Arc<RateLimitConfig>,
) -> Router {
    let tokens = TokenLifecycle::new(db.clone(), jwt.clone());

    let auth_routes_state = auth::AuthRoutesState {
        db: db.clone(),
        tokens: tokens.clone(),
        settings: settings.clone(),
        rate_limit_config: rate_limit_config.clone(),
    };

    let oauth_state = oauth::OauthState {
        db: db.clone(),
        tokens,
        settings: settings.clone(),
        google,
        rate_limit_config: rate_limit_config.clone(),
    };

    let accounts_state = accounts::AccountsState { db: db.clone() };

    let phrases_state = phrases::PhrasesState { db: db.clone() };

    let bookmarks_state = bookmarks::BookmarksState { db: db.clone() };

    let translate_state = translate::TranslateState { translator };

    let mail_state = mail::MailState {
        db: db.clone(),
        mailer,
        rate_limit_config: rate_limit_config.clone(),
    };

    let auth_state = AuthState { db, jwt, settings };

    Router::new()
        .nest("/auth", auth::router(auth_routes_state))
        .nest("/oauth", oauth::router(oauth_state))
        .nest("/accounts", accounts::router(accounts_state))
        .nest("/phrases", phrases::router(phrases_state))
        .nest("/bookmarks", bookmarks::router(bookmarks_state))
        .nest("/translate", translate::router(translate_state))
        .nest("/email", mail::router(mail_state))
        .layer(middleware::from_fn_with_state(auth_state, authenticate))
        .layer(middleware::from_fn_with_state(
            rate_limit_config,
            rate_limit_general,
        ))
}
