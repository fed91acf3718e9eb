//! Schema and transformer tests

use super::*;
use crate::types::JsonObject;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

fn schema() -> JsonSchema {
    let mut schema = JsonSchema::new();
    schema.add_property("Id", SchemaProperty::nullable(JsonType::String));
    schema.add_property("Name", SchemaProperty::nullable(JsonType::String));
    schema.add_property("Score", SchemaProperty::nullable(JsonType::Number));
    schema.add_property("Count", SchemaProperty::nullable(JsonType::Integer));
    schema.add_property("Active", SchemaProperty::nullable(JsonType::Boolean));
    schema.add_property("UpdatedAt", SchemaProperty::date_time());
    schema.add_property("Required", SchemaProperty::new(JsonType::String));
    schema
}

fn record(value: serde_json::Value) -> JsonObject {
    value.as_object().cloned().unwrap()
}

// ============================================================================
// Type Tests
// ============================================================================

#[test]
fn test_nullable_type_serialization() {
    let prop = SchemaProperty::date_time();
    assert_eq!(
        serde_json::to_value(&prop).unwrap(),
        json!({"type": ["null", "string"], "format": "date-time"})
    );
    assert!(prop.is_nullable());
    assert_eq!(prop.json_type.primary_type(), Some(JsonType::String));
}

#[test]
fn test_schema_deserialize() {
    let schema: JsonSchema = serde_json::from_value(json!({
        "type": "object",
        "properties": {
            "id": {"type": "string"},
            "elements": {"type": ["null", "array"], "items": {"type": ["null", "object"]}}
        },
        "additionalProperties": false
    }))
    .unwrap();

    assert_eq!(schema.properties.len(), 2);
    assert_eq!(schema.additional_properties, Some(false));
    let elements = schema.get_property("elements").unwrap();
    assert_eq!(elements.json_type.primary_type(), Some(JsonType::Array));
    assert!(elements.items.is_some());
}

#[test]
fn test_null_only_type_has_no_primary() {
    assert_eq!(JsonTypeOrArray::nullable(JsonType::Null).primary_type(), None);
    assert_eq!(JsonType::Boolean.to_string(), "boolean");
}

// ============================================================================
// Transformer Tests
// ============================================================================

#[test]
fn test_transform_passes_nulls_for_nullable_fields() {
    let t = Transformer::new("contacts", schema());
    let out = t
        .transform(record(json!({"Name": null, "Id": "5"})))
        .unwrap();
    assert_eq!(out, record(json!({"Name": null, "Id": "5"})));
}

#[test]
fn test_transform_rejects_null_for_required_type() {
    let t = Transformer::new("contacts", schema());
    let err = t.transform(record(json!({"Required": null}))).unwrap_err();
    assert!(matches!(err, crate::Error::Transform { ref field, .. } if field == "Required"));
}

#[test_case(json!("1.5"), json!(1.5) ; "numeric string")]
#[test_case(json!("42"), json!(42) ; "integral string")]
#[test_case(json!(3.25), json!(3.25) ; "number passes through")]
fn test_transform_number(input: serde_json::Value, expected: serde_json::Value) {
    let t = Transformer::new("s", schema());
    let out = t.transform(record(json!({"Score": input}))).unwrap();
    assert_eq!(out["Score"], expected);
}

#[test_case(json!("7"), json!(7) ; "string")]
#[test_case(json!(7.0), json!(7) ; "integral float")]
#[test_case(json!(7), json!(7) ; "integer")]
fn test_transform_integer(input: serde_json::Value, expected: serde_json::Value) {
    let t = Transformer::new("s", schema());
    let out = t.transform(record(json!({"Count": input}))).unwrap();
    assert_eq!(out["Count"], expected);
}

#[test]
fn test_transform_integer_rejects_fraction() {
    let t = Transformer::new("s", schema());
    assert!(t.transform(record(json!({"Count": "7.5"}))).is_err());
}

#[test_case(json!("true"), true ; "lower true")]
#[test_case(json!("False"), false ; "capital false")]
#[test_case(json!(true), true ; "bool")]
fn test_transform_boolean(input: serde_json::Value, expected: bool) {
    let t = Transformer::new("s", schema());
    let out = t.transform(record(json!({"Active": input}))).unwrap();
    assert_eq!(out["Active"], json!(expected));
}

#[test_case(json!("2019-01-01 12:30:00.123"), "2019-01-01T12:30:00.123Z" ; "eloqua format")]
#[test_case(json!("2019-01-01T12:30:00+02:00"), "2019-01-01T10:30:00Z" ; "rfc3339 offset")]
#[test_case(json!(1_546_300_800), "2019-01-01T00:00:00Z" ; "unix seconds")]
#[test_case(json!("1546300800"), "2019-01-01T00:00:00Z" ; "unix seconds string")]
fn test_transform_date_time(input: serde_json::Value, expected: &str) {
    let t = Transformer::new("s", schema());
    let out = t.transform(record(json!({"UpdatedAt": input}))).unwrap();
    assert_eq!(out["UpdatedAt"], json!(expected));
}

#[test]
fn test_transform_bad_date_time() {
    let t = Transformer::new("s", schema());
    assert!(t.transform(record(json!({"UpdatedAt": "yesterday"}))).is_err());
}

#[test]
fn test_transform_stringifies_scalars() {
    let t = Transformer::new("s", schema());
    let out = t.transform(record(json!({"Id": 12}))).unwrap();
    assert_eq!(out["Id"], json!("12"));
}

#[test]
fn test_transform_drops_unknown_and_unselected() {
    let t = Transformer::new("s", schema()).with_unselected(vec!["Name".to_string()]);
    let out = t
        .transform(record(json!({"Id": "1", "Name": "x", "Extra": 1})))
        .unwrap();
    assert_eq!(out, record(json!({"Id": "1"})));
}

#[test]
fn test_transform_nested() {
    let mut schema = JsonSchema::new();
    let mut element = SchemaProperty::nullable(JsonType::Object);
    element.properties = Some(
        [("updatedAt".to_string(), SchemaProperty::date_time())]
            .into_iter()
            .collect(),
    );
    let mut elements = SchemaProperty::nullable(JsonType::Array);
    elements.items = Some(Box::new(element));
    schema.add_property("elements", elements);

    let t = Transformer::new("campaigns", schema);
    let out = t
        .transform(record(json!({"elements": [{"updatedAt": "1546300800", "kept": 1}]})))
        .unwrap();

    assert_eq!(
        out["elements"],
        json!([{"updatedAt": "2019-01-01T00:00:00Z", "kept": 1}])
    );

    let err = t
        .transform(record(json!({"elements": [{"updatedAt": "nope"}]})))
        .unwrap_err();
    assert!(err.to_string().contains("elements[0].updatedAt"));
}
