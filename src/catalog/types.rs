//! Catalog types
//!
//! The catalog is the document `--discover` prints and `--catalog` reads back
//! after the user marks streams as selected.

use crate::error::{Error, Result};
use crate::schema::JsonSchema;
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata key holding a field's export statement
pub const STATEMENT_KEY: &str = "tap-eloqua.statement";

/// Metadata key holding a vendor id (custom object or field)
pub const VENDOR_ID_KEY: &str = "tap-eloqua.id";

/// Full stream catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Streams in catalog order
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    /// Read a catalog file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|_| Error::FileNotFound {
            path: path.display().to_string(),
        })?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::config(format!("Invalid catalog {}: {e}", path.display())))
    }

    /// Look up a stream by id
    pub fn get_stream(&self, tap_stream_id: &str) -> Option<&CatalogEntry> {
        self.streams
            .iter()
            .find(|s| s.tap_stream_id == tap_stream_id)
    }

    /// Ids of streams whose root metadata has `selected: true`
    pub fn selected_streams(&self) -> Vec<&str> {
        self.streams
            .iter()
            .filter(|s| s.is_selected())
            .map(|s| s.tap_stream_id.as_str())
            .collect()
    }
}

/// One stream in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stream id
    pub tap_stream_id: String,
    /// Stream name
    pub stream: String,
    /// Primary key fields
    #[serde(default)]
    pub key_properties: Vec<String>,
    /// Record schema
    pub schema: JsonSchema,
    /// Root and per-field metadata
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

impl CatalogEntry {
    /// Root metadata (`breadcrumb: []`)
    pub fn root_metadata(&self) -> Option<&JsonObject> {
        self.metadata
            .iter()
            .find(|m| m.breadcrumb.is_empty())
            .map(|m| &m.metadata)
    }

    /// Metadata for a top-level field
    pub fn field_metadata(&self, field: &str) -> Option<&JsonObject> {
        self.metadata
            .iter()
            .find(|m| m.field_name() == Some(field))
            .map(|m| &m.metadata)
    }

    /// Per-field metadata entries in catalog order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &JsonObject)> {
        self.metadata
            .iter()
            .filter_map(|m| m.field_name().map(|name| (name, &m.metadata)))
    }

    /// Whether the stream is selected for sync
    pub fn is_selected(&self) -> bool {
        self.root_metadata()
            .and_then(|m| m.get("selected"))
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }

    /// Vendor object id stored on the root metadata
    pub fn vendor_id(&self) -> Option<String> {
        match self.root_metadata()?.get(VENDOR_ID_KEY)? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A metadata entry addressed by breadcrumb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Path to the described element (`[]` = stream root)
    pub breadcrumb: Vec<String>,
    /// Metadata values
    pub metadata: JsonObject,
}

impl MetadataEntry {
    /// Root metadata entry
    pub fn root(metadata: JsonObject) -> Self {
        Self {
            breadcrumb: Vec::new(),
            metadata,
        }
    }

    /// Field metadata entry
    pub fn field(name: &str, metadata: JsonObject) -> Self {
        Self {
            breadcrumb: vec!["properties".to_string(), name.to_string()],
            metadata,
        }
    }

    /// Field name when this entry addresses a top-level property
    pub fn field_name(&self) -> Option<&str> {
        match self.breadcrumb.as_slice() {
            [props, name] if props == "properties" => Some(name),
            _ => None,
        }
    }

    /// Whether the field is requested: not explicitly deselected, or automatic
    pub fn is_field_selected(metadata: &JsonObject) -> bool {
        let automatic = metadata.get("inclusion").and_then(JsonValue::as_str) == Some("automatic");
        let deselected = metadata.get("selected").and_then(JsonValue::as_bool) == Some(false);
        automatic || !deselected
    }
}
