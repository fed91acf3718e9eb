//! Authentication module
//!
//! Supports: static bearer tokens, the Eloqua OAuth2 refresh-token flow,
//! and pre-issued dev-mode tokens.
//!
//! The `Authenticator` caches the access token and reports every rotated
//! refresh token so it can be persisted for the next run.

mod authenticator;
mod types;

pub use authenticator::{Authenticator, GrantObserver};
pub use types::{AuthConfig, CachedToken, TokenGrant, DEFAULT_TOKEN_URL, TOKEN_EXPIRY_PAD_SECS};
