//! Eloqua API client
//!
//! `Transport` is the seam the sync and discovery code talks to; the
//! production implementation is `EloquaClient`, which resolves the tenant's
//! base URL from the login service and sends authenticated JSON requests
//! through the retrying [`HttpClient`](crate::http::HttpClient).

mod eloqua;

pub use eloqua::EloquaClient;

use crate::error::Result;
use crate::types::JsonValue;
use async_trait::async_trait;

/// Minimal JSON request interface used by the sync engine
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` (relative to the tenant base URL) with query `params`
    async fn get(&self, path: &str, params: &[(&str, String)], endpoint: &str)
        -> Result<JsonValue>;

    /// POST a JSON `body` to `path`
    async fn post(&self, path: &str, body: JsonValue, endpoint: &str) -> Result<JsonValue>;
}

#[cfg(test)]
mod tests;
