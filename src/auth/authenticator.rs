//! Authenticator implementation
//!
//! Handles applying authentication to requests and managing token refresh.

use super::types::{AuthConfig, CachedToken, TokenGrant};
use crate::error::{Error, Result};
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Attempts made against the token endpoint before a 5xx becomes fatal
const MAX_TOKEN_ATTEMPTS: u32 = 5;

/// Callback invoked whenever the vendor issues a new grant
pub type GrantObserver = Arc<dyn Fn(&TokenGrant) -> Result<()> + Send + Sync>;

/// Authenticator handles applying authentication to HTTP requests
pub struct Authenticator {
    /// Auth configuration
    config: AuthConfig,
    /// Cached access token
    cached_token: RwLock<Option<CachedToken>>,
    /// Latest refresh token (rotates on every grant)
    refresh_token: RwLock<Option<String>>,
    /// HTTP client for token requests
    http_client: Client,
    /// Delay before the first token retry, doubled per attempt
    retry_delay: Duration,
    /// Notified after every successful refresh
    on_grant: Option<GrantObserver>,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: AuthConfig, http_client: Client) -> Self {
        let (cached, refresh) = match &config {
            AuthConfig::DevToken {
                access_token,
                expires_at,
            } => (
                Some(CachedToken::new(access_token.clone(), Some(*expires_at))),
                None,
            ),
            AuthConfig::EloquaRefresh { refresh_token, .. } => (None, Some(refresh_token.clone())),
            _ => (None, None),
        };

        Self {
            config,
            cached_token: RwLock::new(cached),
            refresh_token: RwLock::new(refresh),
            http_client,
            retry_delay: Duration::from_secs(2),
            on_grant: None,
        }
    }

    /// Register a callback for newly issued grants
    #[must_use]
    pub fn on_grant(mut self, observer: GrantObserver) -> Self {
        self.on_grant = Some(observer);
        self
    }

    /// Override the base delay between token endpoint retries
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Apply authentication to a request builder
    pub async fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        match &self.config {
            AuthConfig::None => Ok(req),
            AuthConfig::Bearer { token } => Ok(req.bearer_auth(token)),
            AuthConfig::EloquaRefresh { .. } | AuthConfig::DevToken { .. } => {
                let token = self.access_token().await?;
                Ok(req.bearer_auth(token))
            }
        }
    }

    /// Get a valid access token, refreshing if necessary
    pub async fn access_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached_token.write().await;

        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let new_token = self.fetch_new_token().await?;
        let token_str = new_token.token.clone();
        *cached = Some(new_token);

        Ok(token_str)
    }

    async fn fetch_new_token(&self) -> Result<CachedToken> {
        match &self.config {
            AuthConfig::DevToken { .. } => Err(Error::auth(
                "Access token in config is expired, unable to authenticate in dev mode",
            )),
            AuthConfig::EloquaRefresh {
                token_url,
                client_id,
                client_secret,
                redirect_uri,
                ..
            } => {
                let grant = self
                    .fetch_refresh_grant(token_url, client_id, client_secret, redirect_uri)
                    .await?;

                *self.refresh_token.write().await = Some(grant.refresh_token.clone());
                if let Some(observer) = &self.on_grant {
                    observer(&grant)?;
                }

                Ok(CachedToken::new(grant.access_token, Some(grant.expires_at)))
            }
            _ => Err(Error::auth(
                "Token refresh not supported for this auth type",
            )),
        }
    }

    /// Exchange the current refresh token for a new grant
    async fn fetch_refresh_grant(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant> {
        let refresh_token = self
            .refresh_token
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::auth("No refresh token available"))?;

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", "full"),
        ];

        let mut attempt = 0;
        let response = loop {
            let response = self
                .http_client
                .post(token_url)
                .basic_auth(client_id, Some(client_secret))
                .form(&form)
                .send()
                .await
                .map_err(Error::Http)?;

            if response.status().is_server_error() && attempt + 1 < MAX_TOKEN_ATTEMPTS {
                let delay = self.retry_delay * 2u32.saturating_pow(attempt);
                warn!(
                    status = response.status().as_u16(),
                    "Token endpoint unavailable, retrying in {:?}", delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }
            break response;
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TokenRefresh {
                message: format!(
                    "Unable to authenticate (Eloqua response: status {}: {body})",
                    status.as_u16()
                ),
            });
        }

        let token_response: TokenResponse = response.json().await.map_err(Error::Http)?;
        info!("Refreshed Eloqua access token");
        Ok(token_response.into_grant(refresh_token))
    }

    /// The refresh token currently in effect
    pub async fn current_refresh_token(&self) -> Option<String> {
        self.refresh_token.read().await.clone()
    }

    /// Get the current auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("has_grant_observer", &self.on_grant.is_some())
            .finish_non_exhaustive()
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

impl TokenResponse {
    fn into_grant(self, previous_refresh: String) -> TokenGrant {
        TokenGrant {
            access_token: self.access_token,
            refresh_token: self.refresh_token.unwrap_or(previous_refresh),
            expires_at: Utc::now() + chrono::Duration::seconds(self.expires_in),
        }
    }
}
