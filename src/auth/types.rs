//! Auth configuration types

use chrono::{DateTime, Utc};

/// Default Eloqua OAuth2 token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://login.eloqua.com/auth/oauth2/token";

/// Seconds shaved off a token's lifetime before it is considered expired
pub const TOKEN_EXPIRY_PAD_SECS: i64 = 10;

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// Static bearer token
    Bearer {
        /// The bearer token
        token: String,
    },

    /// Eloqua OAuth2 refresh-token flow
    ///
    /// Client credentials travel as HTTP basic auth; the response rotates
    /// the refresh token, which must be persisted for the next run.
    EloquaRefresh {
        /// Token endpoint URL
        token_url: String,
        /// OAuth client id
        client_id: String,
        /// OAuth client secret
        client_secret: String,
        /// Refresh token from the previous grant
        refresh_token: String,
        /// Redirect URI registered with the app
        redirect_uri: String,
    },

    /// Pre-issued access token that is never refreshed (dev mode)
    DevToken {
        /// The access token
        access_token: String,
        /// When the token stops being valid
        expires_at: DateTime<Utc>,
    },
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired, allowing for the safety pad
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let pad = chrono::Duration::seconds(TOKEN_EXPIRY_PAD_SECS);
                Utc::now() + pad >= expires_at
            }
            None => false,
        }
    }
}

/// A freshly issued grant, reported so credentials can be written back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// New access token
    pub access_token: String,
    /// Rotated refresh token
    pub refresh_token: String,
    /// Expiry of the access token
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_cached_token_not_expired() {
        let token = CachedToken::expires_in("test".to_string(), 3600);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_cached_token_expired() {
        let token = CachedToken::expires_in("test".to_string(), -100);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_inside_pad_is_expired() {
        let token = CachedToken::expires_in("test".to_string(), TOKEN_EXPIRY_PAD_SECS - 1);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_no_expiration() {
        let token = CachedToken::new("test".to_string(), None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(matches!(config, AuthConfig::None));
    }
}
