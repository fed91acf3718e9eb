//! Tests for the Eloqua client

use super::*;
use crate::http::{HttpClient, HttpClientConfig};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http() -> HttpClient {
    HttpClient::with_config(
        HttpClientConfig::builder()
            .max_retries(1)
            .backoff(Duration::from_millis(1), Duration::from_millis(1))
            .no_rate_limit()
            .build(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_base_url_resolved_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "urls": {"base": server.uri()}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/bulk/2.0/syncs/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = EloquaClient::new(http(), format!("{}/id", server.uri()));

    for _ in 0..2 {
        let status = client
            .get("/api/bulk/2.0/syncs/7", &[], "sync_status")
            .await
            .unwrap();
        assert_eq!(status["status"], "pending");
    }
}

#[tokio::test]
async fn test_get_sends_query_params() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bulk/2.0/syncs/7/data"))
        .and(query_param("limit", "5000"))
        .and(query_param("offset", "10000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"Id": "1"}],
            "hasMore": false
        })))
        .mount(&server)
        .await;

    let client = EloquaClient::with_base_url(http(), server.uri());
    let page = client
        .get(
            "/api/bulk/2.0/syncs/7/data",
            &[("limit", "5000".to_string()), ("offset", "10000".to_string())],
            "sync_data",
        )
        .await
        .unwrap();

    assert_eq!(page["items"][0]["Id"], "1");
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/bulk/2.0/syncs"))
        .and(body_json(json!({"syncedInstanceUri": "/contacts/exports/1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"uri": "/syncs/99"})))
        .mount(&server)
        .await;

    let client = EloquaClient::with_base_url(http(), server.uri());
    let created = client
        .post(
            "/api/bulk/2.0/syncs",
            json!({"syncedInstanceUri": "/contacts/exports/1"}),
            "create_sync",
        )
        .await
        .unwrap();

    assert_eq!(created["uri"], "/syncs/99");
}

#[tokio::test]
async fn test_client_errors_surface_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bulk/2.0/syncs/1/data"))
        .respond_with(ResponseTemplate::new(410).set_body_string("gone"))
        .mount(&server)
        .await;

    let client = EloquaClient::with_base_url(http(), server.uri());
    let err = client
        .get("/api/bulk/2.0/syncs/1/data", &[], "sync_data")
        .await
        .unwrap_err();

    assert!(err.is_gone());
    assert!(matches!(err, crate::Error::HttpStatus { status: 410, .. }));
}

#[tokio::test]
async fn test_missing_base_url_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"urls": {}})))
        .mount(&server)
        .await;

    let client = EloquaClient::new(http(), format!("{}/id", server.uri()));
    let err = client.base_url().await.unwrap_err();
    assert!(matches!(err, crate::Error::UnexpectedResponse { .. }));
}
