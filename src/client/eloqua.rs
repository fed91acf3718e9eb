//! Production transport

use super::Transport;
use crate::auth::Authenticator;
use crate::config::TapConfig;
use crate::error::{Error, Result};
use crate::http::{join_url, HttpClient, HttpClientConfig, RateLimiterConfig, RequestConfig};
use crate::types::{JsonValue, OptionStringExt};
use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Authenticated client for one Eloqua tenant
#[derive(Debug)]
pub struct EloquaClient {
    http: HttpClient,
    id_url: String,
    base_url: OnceCell<String>,
}

impl EloquaClient {
    /// Create a client that looks up its base URL at `id_url` on first use
    pub fn new(http: HttpClient, id_url: impl Into<String>) -> Self {
        Self {
            http,
            id_url: id_url.into(),
            base_url: OnceCell::new(),
        }
    }

    /// Create a client with a fixed base URL
    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            id_url: String::new(),
            base_url: OnceCell::new_with(Some(base_url.into())),
        }
    }

    /// Build a client from the connector config
    pub fn from_config(config: &TapConfig, authenticator: Arc<Authenticator>) -> Result<Self> {
        let mut builder = HttpClientConfig::builder();
        if let Some(agent) = config.user_agent.clone().none_if_empty() {
            builder = builder.user_agent(agent);
        }
        builder = match config.requests_per_second {
            Some(rps) => builder.rate_limit(RateLimiterConfig::per_second(rps)),
            None => builder.no_rate_limit(),
        };

        let http = HttpClient::with_auth(builder.build(), authenticator)?;

        Ok(match config.base_url.clone().none_if_empty() {
            Some(base) => Self::with_base_url(http, base),
            None => Self::new(http, config.id_url()),
        })
    }

    /// Tenant base URL, fetched from the login service once per client
    pub async fn base_url(&self) -> Result<&str> {
        let base = self
            .base_url
            .get_or_try_init(|| async {
                let id: JsonValue = self.http.get_json(&self.id_url).await?;
                let base = id
                    .pointer("/urls/base")
                    .and_then(JsonValue::as_str)
                    .ok_or_else(|| Error::unexpected("id", "response has no urls.base"))?;
                info!(base_url = base, "Resolved Eloqua base URL");
                Ok::<_, Error>(base.to_string())
            })
            .await?;
        Ok(base.as_str())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        request: RequestConfig,
        endpoint: &str,
    ) -> Result<JsonValue> {
        let url = join_url(self.base_url().await?, path);
        let started = Instant::now();
        let result = self.http.request_json(method, &url, request).await;
        debug!(
            endpoint,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "request complete"
        );
        result
    }
}

#[async_trait]
impl Transport for EloquaClient {
    async fn get(
        &self,
        path: &str,
        params: &[(&str, String)],
        endpoint: &str,
    ) -> Result<JsonValue> {
        let request = params
            .iter()
            .fold(RequestConfig::new(), |req, (k, v)| req.query(*k, v.as_str()));
        self.send(Method::GET, path, request, endpoint).await
    }

    async fn post(&self, path: &str, body: JsonValue, endpoint: &str) -> Result<JsonValue> {
        self.send(Method::POST, path, RequestConfig::new().json(body), endpoint)
            .await
    }
}
