//! Record coercion against a stream schema

use super::types::{JsonSchema, JsonType, SchemaProperty};
use crate::error::{Error, Result};
use crate::types::{parse_timestamp, JsonObject, JsonValue};
use chrono::SecondsFormat;
use serde_json::Number;
use std::collections::BTreeSet;

/// Coerces raw vendor rows into schema-conforming records
#[derive(Debug, Clone)]
pub struct Transformer {
    stream: String,
    schema: JsonSchema,
    unselected: BTreeSet<String>,
}

impl Transformer {
    /// Create a transformer for `stream`
    pub fn new(stream: impl Into<String>, schema: JsonSchema) -> Self {
        Self {
            stream: stream.into(),
            schema,
            unselected: BTreeSet::new(),
        }
    }

    /// Drop these top-level fields from every record
    #[must_use]
    pub fn with_unselected(mut self, fields: impl IntoIterator<Item = String>) -> Self {
        self.unselected.extend(fields);
        self
    }

    /// Coerce one record. Fields unknown to the schema or deselected are dropped.
    pub fn transform(&self, record: JsonObject) -> Result<JsonObject> {
        let mut out = JsonObject::new();
        for (field, value) in record {
            if self.unselected.contains(&field) {
                continue;
            }
            let Some(prop) = self.schema.get_property(&field) else {
                continue;
            };
            let value = self.coerce(&field, prop, value)?;
            out.insert(field, value);
        }
        Ok(out)
    }

    fn coerce(&self, path: &str, prop: &SchemaProperty, value: JsonValue) -> Result<JsonValue> {
        if value.is_null() {
            return if prop.is_nullable() {
                Ok(JsonValue::Null)
            } else {
                Err(self.fail(path, "null is not allowed"))
            };
        }

        let Some(json_type) = prop.json_type.primary_type() else {
            return Err(self.fail(path, format!("expected null, got {value}")));
        };

        match json_type {
            JsonType::String if prop.is_date_time() => parse_timestamp(&value)
                .map(|dt| JsonValue::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
                .ok_or_else(|| self.fail(path, format!("'{value}' is not a date-time"))),
            JsonType::String => match value {
                JsonValue::String(_) => Ok(value),
                JsonValue::Number(n) => Ok(JsonValue::String(n.to_string())),
                JsonValue::Bool(b) => Ok(JsonValue::String(b.to_string())),
                other => Err(self.fail(path, format!("expected string, got {other}"))),
            },
            JsonType::Integer => to_integer(&value)
                .map(JsonValue::from)
                .ok_or_else(|| self.fail(path, format!("'{value}' is not an integer"))),
            JsonType::Number => to_number(&value)
                .map(JsonValue::Number)
                .ok_or_else(|| self.fail(path, format!("'{value}' is not a number"))),
            JsonType::Boolean => match &value {
                JsonValue::Bool(_) => Ok(value),
                JsonValue::String(s) if s.eq_ignore_ascii_case("true") => Ok(JsonValue::Bool(true)),
                JsonValue::String(s) if s.eq_ignore_ascii_case("false") => {
                    Ok(JsonValue::Bool(false))
                }
                other => Err(self.fail(path, format!("'{other}' is not a boolean"))),
            },
            JsonType::Object => match value {
                JsonValue::Object(obj) => match &prop.properties {
                    Some(props) => {
                        let mut out = JsonObject::new();
                        for (key, inner) in obj {
                            match props.get(&key) {
                                Some(p) => {
                                    let nested = format!("{path}.{key}");
                                    out.insert(key, self.coerce(&nested, p, inner)?);
                                }
                                None => {
                                    out.insert(key, inner);
                                }
                            }
                        }
                        Ok(JsonValue::Object(out))
                    }
                    None => Ok(JsonValue::Object(obj)),
                },
                other => Err(self.fail(path, format!("expected object, got {other}"))),
            },
            JsonType::Array => match value {
                JsonValue::Array(items) => match &prop.items {
                    Some(item_prop) => items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| self.coerce(&format!("{path}[{i}]"), item_prop, item))
                        .collect::<Result<Vec<_>>>()
                        .map(JsonValue::Array),
                    None => Ok(JsonValue::Array(items)),
                },
                other => Err(self.fail(path, format!("expected array, got {other}"))),
            },
            JsonType::Null => Err(self.fail(path, "expected null")),
        }
    }

    fn fail(&self, field: &str, message: impl Into<String>) -> Error {
        Error::transform(&self.stream, field, message)
    }
}

fn to_integer(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

fn to_number(value: &JsonValue) -> Option<Number> {
    match value {
        JsonValue::Number(n) => Some(n.clone()),
        JsonValue::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Some(Number::from(i));
            }
            s.parse::<f64>().ok().and_then(Number::from_f64)
        }
        _ => None,
    }
}
