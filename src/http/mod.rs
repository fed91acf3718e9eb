//! HTTP client module
//!
//! Provides HTTP client with retry, rate limiting, and backoff strategies.
//!
//! # Features
//!
//! - **Automatic Retries**: 5xx, 429, timeouts and connection failures
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Backoff**: exponential, capped
//! - **Authentication**: Integration with auth module

mod client;
mod rate_limit;

pub use client::{join_url, HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
