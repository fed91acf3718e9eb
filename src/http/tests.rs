//! Tests for the HTTP client module

use super::*;
use crate::auth::{AuthConfig, Authenticator};
use crate::error::Error;
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_client(retries: u32) -> HttpClient {
    let config = HttpClientConfig::builder()
        .max_retries(retries)
        .backoff(Duration::from_millis(5), Duration::from_millis(5))
        .no_rate_limit()
        .build();
    HttpClient::with_config(config).unwrap()
}

fn url(server: &MockServer, path: &str) -> String {
    join_url(&server.uri(), path)
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(300));
    assert_eq!(config.max_retries, 4);
    assert_eq!(config.initial_backoff, Duration::from_secs(2));
    assert_eq!(config.max_backoff, Duration::from_secs(60));
    assert!(config.rate_limit.is_some());
    assert!(config.user_agent.starts_with("solidafy-eloqua/"));
}

#[test]
fn test_request_config_builder() {
    let config = RequestConfig::new()
        .query("limit", "5000")
        .query("offset", "0")
        .json(json!({"syncedInstanceUri": "/contacts/exports/1"}));

    assert_eq!(
        config.query,
        vec![
            ("limit".to_string(), "5000".to_string()),
            ("offset".to_string(), "0".to_string())
        ]
    );
    assert!(config.body.is_some());
}

#[test_case("https://a.example.com", "/api/x", "https://a.example.com/api/x" ; "leading slash")]
#[test_case("https://a.example.com/", "/api/x", "https://a.example.com/api/x" ; "double slash")]
#[test_case("https://a.example.com", "api/x", "https://a.example.com/api/x" ; "no slash")]
fn test_join_url(base: &str, path: &str, expected: &str) {
    assert_eq!(join_url(base, path), expected);
}

#[test_case(0, 2_000 ; "first retry")]
#[test_case(3, 16_000 ; "doubles")]
#[test_case(5, 60_000 ; "capped")]
#[test_case(40, 60_000 ; "overflow capped")]
fn test_calculate_backoff(retries: u32, expected_ms: u64) {
    let client = HttpClient::with_config(HttpClientConfig::builder().no_rate_limit().build()).unwrap();
    assert_eq!(
        client.calculate_backoff(retries),
        Duration::from_millis(expected_ms)
    );
}

#[tokio::test]
async fn test_get_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bulk/2.0/syncs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .mount(&server)
        .await;

    let data: serde_json::Value = fast_client(0)
        .get_json(&url(&server, "/api/bulk/2.0/syncs/1"))
        .await
        .unwrap();

    assert_eq!(data["status"], "success");
}

#[tokio::test]
async fn test_request_json_sends_body_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/bulk/2.0/syncs"))
        .and(query_param("dryRun", "false"))
        .and(body_json(json!({"syncedInstanceUri": "/contacts/exports/1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"uri": "/syncs/9"})))
        .expect(1)
        .mount(&server)
        .await;

    let request = RequestConfig::new()
        .query("dryRun", "false")
        .json(json!({"syncedInstanceUri": "/contacts/exports/1"}));
    let created: serde_json::Value = fast_client(0)
        .request_json(Method::POST, &url(&server, "/api/bulk/2.0/syncs"), request)
        .await
        .unwrap();

    assert_eq!(created["uri"], "/syncs/9");
}

#[tokio::test]
async fn test_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "acme-etl/1.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .user_agent("acme-etl/1.0")
        .no_rate_limit()
        .build();
    HttpClient::with_config(config)
        .unwrap()
        .request(Method::GET, &server.uri(), &RequestConfig::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder().no_rate_limit().build();
    let auth = Arc::new(Authenticator::new(AuthConfig::Bearer {
        token: "secret-token".to_string(),
    }));
    HttpClient::with_auth(config, auth)
        .unwrap()
        .request(
            Method::GET,
            &url(&server, "/api/bulk/2.0/contacts/fields"),
            &RequestConfig::new(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .expect(1)
        .mount(&server)
        .await;

    let err = fast_client(3)
        .request(
            Method::GET,
            &url(&server, "/api/bulk/2.0/syncs/1/data"),
            &RequestConfig::new(),
        )
        .await
        .unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Not Found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_retry_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let data: serde_json::Value = fast_client(3)
        .get_json(&url(&server, "/api/bulk/2.0/syncs/1"))
        .await
        .unwrap();

    assert_eq!(data["ok"], true);
}

#[tokio::test]
async fn test_rate_limit_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let response = fast_client(2)
        .request(
            Method::GET,
            &url(&server, "/api/REST/2.0/assets/emails"),
            &RequestConfig::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_rate_limited_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .expect(2)
        .mount(&server)
        .await;

    let err = fast_client(1)
        .request(Method::GET, &server.uri(), &RequestConfig::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_seconds: 0
        }
    ));
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let err = fast_client(2)
        .request(Method::GET, &server.uri(), &RequestConfig::new())
        .await
        .unwrap_err();

    match &err {
        Error::HttpStatus { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_connection_refused_is_retried_then_returned() {
    // Nothing listens on port 1
    let err = fast_client(1)
        .request(Method::GET, "http://127.0.0.1:1/id", &RequestConfig::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Http(_)));
    assert!(err.is_retryable());
}

#[test]
fn test_http_client_debug() {
    let client = fast_client(0);
    let debug = format!("{client:?}");
    assert!(debug.contains("HttpClient"));
    assert!(debug.contains("has_authenticator: false"));
    assert!(debug.contains("has_rate_limiter: false"));
}

#[tokio::test]
async fn test_requests_pass_through_rate_limiter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .rate_limit(RateLimiterConfig::new(100, 10))
        .build();
    let client = HttpClient::with_config(config).unwrap();

    for _ in 0..3 {
        client
            .request(Method::GET, &server.uri(), &RequestConfig::new())
            .await
            .unwrap();
    }
}
