//! Token-based authentication with refresh rotation.
//!
//! Dual-token system: short-lived access tokens carrying an identity
//! claim, and long-lived refresh tokens stored one-per-account. Every
//! refresh exchange rotates the stored token (single-use), and the
//! per-request middleware decides which path a request takes before any
//! handler runs.

mod bearer;
mod errors;
mod extractors;
mod lifecycle;
mod middleware;
mod resolver;
mod types;

pub use bearer::{BEARER_PREFIX, bearer_token};
pub use errors::{ApiAuthError, AuthError, RefreshRejection};
pub use extractors::{AdminAuth, ApiAuth, MaybeAuth};
pub use lifecycle::{TokenLifecycle, TokenPair};
pub use middleware::{AuthSettings, AuthState, authenticate};
pub use resolver::resolve_identity;
pub use types::Principal;
