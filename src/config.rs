//! Connector configuration
//!
//! The config file is a flat JSON object. Eloqua rotates refresh tokens on
//! every grant, so the file is also written back to (see
//! [`update_config_file`]) with only the credential keys replaced.

use crate::auth::{AuthConfig, DEFAULT_TOKEN_URL};
use crate::error::{Error, Result};
use crate::types::{parse_timestamp_str, JsonObject, JsonValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Keys that must be present in every config file
pub const REQUIRED_CONFIG_KEYS: &[&str] = &[
    "start_date",
    "client_id",
    "client_secret",
    "refresh_token",
    "redirect_uri",
];

/// Default number of rows requested per bulk export page
pub const DEFAULT_BULK_PAGE_SIZE: u64 = 5000;

/// Largest page Eloqua serves from a sync's data endpoint
pub const MAX_BULK_PAGE_SIZE: u64 = 50000;

/// Default Eloqua login host
pub const DEFAULT_LOGIN_URL: &str = "https://login.eloqua.com";

/// Runtime configuration for the connector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Earliest cursor value for streams without a bookmark
    pub start_date: String,

    /// OAuth client id
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// OAuth refresh token
    pub refresh_token: String,

    /// OAuth redirect URI
    pub redirect_uri: String,

    /// Optional User-Agent header
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Rows per bulk export page
    #[serde(default = "default_bulk_page_size")]
    pub bulk_page_size: u64,

    /// Fixed API base URL; skips the login `id` lookup when set
    #[serde(default)]
    pub base_url: Option<String>,

    /// Login service host
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Client-side request rate cap
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// Access token written back after the last refresh (used in dev mode)
    #[serde(default)]
    pub access_token: Option<String>,

    /// Expiry of `access_token`, ISO-8601
    #[serde(default)]
    pub expires_in: Option<String>,
}

fn default_bulk_page_size() -> u64 {
    DEFAULT_BULK_PAGE_SIZE
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

impl TapConfig {
    /// Parse and validate a config from a JSON value
    pub fn from_value(value: JsonValue) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::config("Config must be a JSON object"))?;

        for key in REQUIRED_CONFIG_KEYS {
            match obj.get(*key) {
                Some(JsonValue::String(s)) if !s.is_empty() => {}
                _ => return Err(Error::missing_field(*key)),
            }
        }

        let config: TapConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let value: JsonValue = serde_json::from_str(&contents)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        Self::from_value(value)
    }

    fn validate(&self) -> Result<()> {
        if parse_timestamp_str(&self.start_date).is_none() {
            return Err(Error::InvalidConfigValue {
                field: "start_date".to_string(),
                message: format!("'{}' is not a valid timestamp", self.start_date),
            });
        }
        check_bulk_page_size(self.bulk_page_size)?;
        url::Url::parse(&self.login_url)?;
        if let Some(base) = self.base_url.as_deref().filter(|b| !b.is_empty()) {
            url::Url::parse(base)?;
        }
        Ok(())
    }

    /// Token endpoint derived from the login host
    pub fn token_url(&self) -> String {
        if self.login_url == DEFAULT_LOGIN_URL {
            DEFAULT_TOKEN_URL.to_string()
        } else {
            format!("{}/auth/oauth2/token", self.login_url.trim_end_matches('/'))
        }
    }

    /// Endpoint returning the instance's base URLs
    pub fn id_url(&self) -> String {
        format!("{}/id", self.login_url.trim_end_matches('/'))
    }

    /// Build the auth configuration for this run
    pub fn auth_config(&self, dev_mode: bool) -> Result<AuthConfig> {
        if dev_mode {
            let access_token = self
                .access_token
                .clone()
                .ok_or_else(|| Error::missing_field("access_token"))?;
            let expires_at = self
                .access_token_expiry()
                .ok_or_else(|| Error::missing_field("expires_in"))?;
            return Ok(AuthConfig::DevToken {
                access_token,
                expires_at,
            });
        }

        Ok(AuthConfig::EloquaRefresh {
            token_url: self.token_url(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            refresh_token: self.refresh_token.clone(),
            redirect_uri: self.redirect_uri.clone(),
        })
    }

    fn access_token_expiry(&self) -> Option<DateTime<Utc>> {
        self.expires_in.as_deref().and_then(parse_timestamp_str)
    }
}

/// Page sizes outside `1..=50000` are rejected; a zero page never advances the offset
pub fn check_bulk_page_size(size: u64) -> Result<u64> {
    if (1..=MAX_BULK_PAGE_SIZE).contains(&size) {
        Ok(size)
    } else {
        Err(Error::InvalidConfigValue {
            field: "bulk_page_size".to_string(),
            message: format!("{size} is outside 1..={MAX_BULK_PAGE_SIZE}"),
        })
    }
}

/// Merge `updates` into the JSON object stored at `path` and rewrite it.
///
/// Keys not named in `updates` are left untouched. The write goes through a
/// temp file and a rename so a crash never leaves a truncated config.
pub fn update_config_file(path: impl AsRef<Path>, updates: JsonObject) -> Result<JsonObject> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    let mut config: JsonObject = serde_json::from_str(&contents)
        .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;

    config.extend(updates);

    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, serde_json::to_string_pretty(&config)?)?;
    std::fs::rename(&temp_path, path)?;

    Ok(config)
}
