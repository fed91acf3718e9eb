//! Discovery tests

use super::*;
use crate::catalog::{resolve, StreamKind, STATEMENT_KEY, VENDOR_ID_KEY};
use crate::client::EloquaClient;
use crate::http::{HttpClient, HttpClientConfig};
use crate::schema::JsonType;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn field(name: &str, data_type: &str, statement: &str, uri: &str) -> serde_json::Value {
    json!({
        "name": name,
        "internalName": name,
        "dataType": data_type,
        "statement": statement,
        "uri": uri
    })
}

async fn mock_listing(server: &MockServer, route: &str, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": items,
            "hasMore": false
        })))
        .mount(server)
        .await;
}

async fn setup() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bulk/2.0/accounts/fields"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                field("M_CompanyName", "text", "{{Account.Field(M_CompanyName)}}", "/accounts/fields/100"),
                field("M_Date_Modified", "date", "{{Account.Field(M_Date_Modified)}}", "/accounts/fields/101")
            ],
            "hasMore": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Contacts come back in two pages
    Mock::given(method("GET"))
        .and(path("/api/bulk/2.0/contacts/fields"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [field("C_EmailAddress", "emailAddress", "{{Contact.Field(C_EmailAddress)}}", "/contacts/fields/1")],
            "hasMore": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bulk/2.0/contacts/fields"))
        .and(query_param("offset", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                field("C_DateModified", "date", "{{Contact.Field(C_DateModified)}}", "/contacts/fields/2"),
                field("C_Score", "number", "{{Contact.Field(C_Score)}}", "/contacts/fields/3")
            ],
            "hasMore": false
        })))
        .mount(&server)
        .await;

    mock_listing(
        &server,
        "/api/bulk/2.0/activities/fields",
        json!([
            field("ActivityId", "number", "{{Activity.Id}}", ""),
            field("ActivityDate", "date", "{{Activity.CreatedAt}}", ""),
            field("EmailAddress", "text", "{{Activity.Field(EmailAddress)}}", "")
        ]),
    )
    .await;

    mock_listing(
        &server,
        "/api/bulk/2.0/customObjects",
        json!([{"name": "Event Registrations", "uri": "/customObjects/17"}]),
    )
    .await;

    mock_listing(
        &server,
        "/api/bulk/2.0/customObjects/17/fields",
        json!([field("Email", "text", "{{CustomObject[17].Field[200]}}", "/customObjects/17/fields/200")]),
    )
    .await;

    server
}

fn context(server: &MockServer) -> DiscoveryContext {
    let http = HttpClient::with_config(HttpClientConfig::builder().no_rate_limit().build()).unwrap();
    DiscoveryContext::new(Arc::new(EloquaClient::with_base_url(http, server.uri())))
}

#[test]
fn test_field_type_mapping() {
    assert!(field_type("date").is_date_time());
    assert_eq!(
        field_type("number").json_type.primary_type(),
        Some(JsonType::Number)
    );
    let text = field_type("emailAddress");
    assert_eq!(text.json_type.primary_type(), Some(JsonType::String));
    assert!(text.is_nullable());
}

#[tokio::test]
async fn test_discover_stream_order() {
    let server = setup().await;
    let ctx = context(&server);

    let catalog = ctx.catalog().await.unwrap();
    let ids: Vec<&str> = catalog
        .streams
        .iter()
        .map(|s| s.tap_stream_id.as_str())
        .collect();

    assert_eq!(
        ids,
        vec![
            "accounts",
            "contacts",
            "activity_email_open",
            "activity_email_clickthrough",
            "activity_email_send",
            "activity_subscribe",
            "activity_unsubscribe",
            "activity_bounceback",
            "activity_web_visit",
            "activity_page_view",
            "activity_form_submit",
            "event_registrations",
            "visitors",
            "campaigns",
            "emails",
            "forms",
            "landing_pages",
        ]
    );
}

#[tokio::test]
async fn test_discover_is_cached() {
    let server = setup().await;
    let ctx = context(&server);

    ctx.catalog().await.unwrap();
    ctx.catalog().await.unwrap();
    // accounts mock expects exactly one call; verified on drop
}

#[tokio::test]
async fn test_discover_contacts_pages_and_injects_fields() {
    let server = setup().await;
    let ctx = context(&server);
    let contacts = ctx.catalog().await.unwrap().get_stream("contacts").unwrap();

    for name in ["C_EmailAddress", "C_DateModified", "C_Score", "Id", "CreatedAt", "UpdatedAt"] {
        assert!(contacts.schema.get_property(name).is_some(), "missing {name}");
    }
    assert!(contacts.schema.get_property("C_DateModified").unwrap().is_date_time());
    assert_eq!(contacts.key_properties, vec!["Id".to_string()]);

    let email = contacts.field_metadata("C_EmailAddress").unwrap();
    assert_eq!(email["inclusion"], "available");
    assert_eq!(email[STATEMENT_KEY], "{{Contact.Field(C_EmailAddress)}}");
    assert_eq!(email[VENDOR_ID_KEY], "1");

    assert_eq!(contacts.field_metadata("Id").unwrap()["inclusion"], "automatic");
    assert_eq!(
        contacts.field_metadata("C_DateModified").unwrap()["inclusion"],
        "automatic"
    );

    let root = contacts.root_metadata().unwrap();
    assert_eq!(root["valid-replication-keys"], json!(["C_DateModified"]));
    assert!(!contacts.is_selected());
}

#[tokio::test]
async fn test_discover_custom_object() {
    let server = setup().await;
    let ctx = context(&server);
    let entry = ctx
        .catalog()
        .await
        .unwrap()
        .get_stream("event_registrations")
        .unwrap()
        .clone();

    assert_eq!(entry.vendor_id().as_deref(), Some("17"));
    assert_eq!(
        entry.field_metadata("UpdatedAt").unwrap()[STATEMENT_KEY],
        "{{CustomObject[17].UpdatedAt}}"
    );

    let descriptor = resolve(&entry).unwrap();
    assert_eq!(
        descriptor.kind,
        StreamKind::Custom {
            object_id: "17".to_string()
        }
    );
}

#[tokio::test]
async fn test_discover_activity_uses_vendor_fields() {
    let server = setup().await;
    let ctx = context(&server);
    let entry = ctx
        .catalog()
        .await
        .unwrap()
        .get_stream("activity_web_visit")
        .unwrap();

    assert_eq!(entry.key_properties, vec!["ActivityId".to_string()]);
    assert!(entry.schema.get_property("Id").is_none());
    assert!(entry.schema.get_property("ActivityDate").unwrap().is_date_time());
}

#[tokio::test]
async fn test_discover_rest_streams() {
    let server = setup().await;
    let ctx = context(&server);
    let visitors = ctx.catalog().await.unwrap().get_stream("visitors").unwrap();

    assert_eq!(visitors.key_properties, vec!["visitorId".to_string()]);
    assert_eq!(
        visitors.field_metadata("v_LastVisitDateAndTime").unwrap()["inclusion"],
        "automatic"
    );
    assert!(visitors.field_metadata("v_City").unwrap().get(STATEMENT_KEY).is_none());
}

#[tokio::test]
async fn test_discover_vendor_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let ctx = context(&server);
    let err = ctx.catalog().await.unwrap_err();
    assert!(matches!(err, crate::Error::HttpStatus { status: 401, .. }));
}
