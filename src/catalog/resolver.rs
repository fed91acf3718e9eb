//! Field selection resolver
//!
//! Turns a catalog entry into the immutable [`StreamDescriptor`] the sync
//! engine works from: which vendor statements to export, the key, and the
//! "last updated" field used for cursoring.

use super::streams::{activity_type_for, rest_endpoint, RestEndpoint, BUILT_IN_BULK_OBJECTS};
use super::types::{CatalogEntry, MetadataEntry, STATEMENT_KEY};
use crate::error::{Error, Result};
use crate::schema::{JsonSchema, Transformer};
use crate::types::JsonValue;
use std::collections::BTreeMap;

/// How a stream is extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamKind {
    /// `accounts` or `contacts`
    BuiltIn {
        /// Bulk object name
        object: String,
    },
    /// One activity type of `/activities`
    Activity {
        /// Vendor activity type, e.g. `EmailOpen`
        activity_type: String,
    },
    /// A custom data object
    Custom {
        /// Vendor object id
        object_id: String,
    },
    /// A paged REST endpoint
    Rest {
        /// Endpoint definition
        endpoint: &'static RestEndpoint,
    },
}

/// Everything the sync engine needs to know about one stream
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    /// Stream id
    pub stream: String,
    /// Extraction kind
    pub kind: StreamKind,
    /// Field name -> export statement
    pub fields: BTreeMap<String, String>,
    /// Primary key fields
    pub key_properties: Vec<String>,
    /// Field holding the record's last-updated time
    pub updated_at_field: String,
    /// Record schema
    pub schema: JsonSchema,
    /// Fields dropped from emitted records
    pub unselected: Vec<String>,
}

impl StreamDescriptor {
    /// Path segment after `/api/bulk/2.0/` for this stream's exports
    pub fn export_object(&self) -> Option<String> {
        match &self.kind {
            StreamKind::BuiltIn { object } => Some(object.clone()),
            StreamKind::Activity { .. } => Some("activities".to_string()),
            StreamKind::Custom { object_id } => Some(format!("customObjects/{object_id}")),
            StreamKind::Rest { .. } => None,
        }
    }

    /// Statement of the updated-at field
    pub fn updated_at_statement(&self) -> Option<&str> {
        self.fields.get(&self.updated_at_field).map(String::as_str)
    }

    /// Whether this stream goes through the bulk export API
    pub fn is_bulk(&self) -> bool {
        !matches!(self.kind, StreamKind::Rest { .. })
    }

    /// Record transformer for this stream
    pub fn transformer(&self) -> Transformer {
        Transformer::new(&self.stream, self.schema.clone())
            .with_unselected(self.unselected.iter().cloned())
    }
}

/// Statements injected for bulk objects that have Id / CreatedAt / UpdatedAt
pub fn system_fields(kind: &StreamKind) -> Vec<(&'static str, String)> {
    let prefix = match kind {
        StreamKind::BuiltIn { object } if object == "accounts" => "Account".to_string(),
        StreamKind::BuiltIn { .. } => "Contact".to_string(),
        StreamKind::Custom { object_id } => format!("CustomObject[{object_id}]"),
        StreamKind::Activity { .. } => {
            return vec![
                ("ActivityId", "{{Activity.Id}}".to_string()),
                ("ActivityDate", "{{Activity.CreatedAt}}".to_string()),
            ]
        }
        StreamKind::Rest { .. } => return Vec::new(),
    };
    vec![
        ("Id", format!("{{{{{prefix}.Id}}}}")),
        ("CreatedAt", format!("{{{{{prefix}.CreatedAt}}}}")),
        ("UpdatedAt", format!("{{{{{prefix}.UpdatedAt}}}}")),
    ]
}

/// Default key and updated-at field for a stream kind
pub fn stream_keys(kind: &StreamKind) -> (&'static str, &'static str) {
    match kind {
        StreamKind::BuiltIn { object } if object == "accounts" => ("Id", "M_Date_Modified"),
        StreamKind::BuiltIn { .. } => ("Id", "C_DateModified"),
        StreamKind::Activity { .. } => ("ActivityId", "ActivityDate"),
        StreamKind::Custom { .. } => ("Id", "UpdatedAt"),
        StreamKind::Rest { endpoint } => (endpoint.key, endpoint.order_by),
    }
}

/// Statement for a built-in object's updated-at field when the catalog lacks one
pub fn default_updated_statement(kind: &StreamKind, field: &str) -> Option<String> {
    match kind {
        StreamKind::BuiltIn { object } if object == "accounts" => {
            Some(format!("{{{{Account.Field({field})}}}}"))
        }
        StreamKind::BuiltIn { .. } => Some(format!("{{{{Contact.Field({field})}}}}")),
        _ => None,
    }
}

/// Classify a catalog entry
pub fn stream_kind(entry: &CatalogEntry) -> Result<StreamKind> {
    let id = entry.tap_stream_id.as_str();
    if BUILT_IN_BULK_OBJECTS.contains(&id) {
        return Ok(StreamKind::BuiltIn {
            object: id.to_string(),
        });
    }
    if let Some(activity_type) = activity_type_for(id) {
        return Ok(StreamKind::Activity {
            activity_type: activity_type.to_string(),
        });
    }
    if let Some(endpoint) = rest_endpoint(id) {
        return Ok(StreamKind::Rest { endpoint });
    }
    match entry.vendor_id() {
        Some(object_id) => Ok(StreamKind::Custom { object_id }),
        None => Err(Error::catalog(
            id,
            "not a known stream and has no tap-eloqua.id custom object id",
        )),
    }
}

/// Build the descriptor for one catalog entry
pub fn resolve(entry: &CatalogEntry) -> Result<StreamDescriptor> {
    let kind = stream_kind(entry)?;
    let (default_key, updated_at_field) = stream_keys(&kind);

    let mut fields = BTreeMap::new();
    let mut unselected = Vec::new();
    if !matches!(kind, StreamKind::Rest { .. }) {
        for (name, metadata) in entry.fields() {
            if !MetadataEntry::is_field_selected(metadata) {
                unselected.push(name.to_string());
                continue;
            }
            let statement = metadata
                .get(STATEMENT_KEY)
                .and_then(JsonValue::as_str)
                .ok_or_else(|| {
                    Error::catalog(&entry.tap_stream_id, format!("field {name} has no statement"))
                })?;
            fields.insert(name.to_string(), statement.to_string());
        }

        for (name, statement) in system_fields(&kind) {
            fields.entry(name.to_string()).or_insert(statement);
        }

        if !fields.contains_key(updated_at_field) {
            let statement = entry
                .field_metadata(updated_at_field)
                .and_then(|m| m.get(STATEMENT_KEY))
                .and_then(JsonValue::as_str)
                .map(ToString::to_string)
                .or_else(|| default_updated_statement(&kind, updated_at_field))
                .ok_or_else(|| {
                    Error::catalog(
                        &entry.tap_stream_id,
                        format!("no statement for updated-at field {updated_at_field}"),
                    )
                })?;
            unselected.retain(|f| f != updated_at_field);
            fields.insert(updated_at_field.to_string(), statement);
        }
    } else {
        unselected = entry
            .fields()
            .filter(|(_, m)| !MetadataEntry::is_field_selected(m))
            .map(|(name, _)| name.to_string())
            .collect();
    }

    let key_properties = if entry.key_properties.is_empty() {
        vec![default_key.to_string()]
    } else {
        entry.key_properties.clone()
    };

    Ok(StreamDescriptor {
        stream: entry.tap_stream_id.clone(),
        kind,
        fields,
        key_properties,
        updated_at_field: updated_at_field.to_string(),
        schema: entry.schema.clone(),
        unselected,
    })
}
