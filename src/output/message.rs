//! Output message types
//!
//! One JSON object per line, tagged by `type`:
//!
//! ```json
//! {"type":"SCHEMA","stream":"contacts","schema":{...},"key_properties":["Id"],"bookmark_properties":["C_DateModified"]}
//! {"type":"RECORD","stream":"contacts","record":{...},"time_extracted":"2024-01-01T00:00:00Z"}
//! {"type":"STATE","value":{"bookmarks":{...},"current_stream":"contacts"}}
//! ```

use crate::state::State;
use crate::types::{JsonObject, JsonValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message emitted on the output stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Message {
    /// Stream schema, written once before the stream's records
    Schema {
        /// Stream id
        stream: String,
        /// JSON schema of the records
        schema: JsonValue,
        /// Primary key fields
        key_properties: Vec<String>,
        /// Replication key fields
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        bookmark_properties: Vec<String>,
    },
    /// One extracted row
    Record {
        /// Stream id
        stream: String,
        /// Row data
        record: JsonObject,
        /// Extraction time
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_extracted: Option<DateTime<Utc>>,
    },
    /// Full state container
    State {
        /// Serialized state
        value: JsonValue,
    },
}

impl Message {
    /// Create a schema message
    pub fn schema(
        stream: impl Into<String>,
        schema: JsonValue,
        key_properties: Vec<String>,
        bookmark_properties: Vec<String>,
    ) -> Self {
        Self::Schema {
            stream: stream.into(),
            schema,
            key_properties,
            bookmark_properties,
        }
    }

    /// Create a record message stamped with the current time
    pub fn record(stream: impl Into<String>, record: JsonObject) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: Some(Utc::now()),
        }
    }

    /// Create a state message from a state container
    pub fn state(state: &State) -> Self {
        Self::State {
            value: serde_json::to_value(state).unwrap_or(JsonValue::Null),
        }
    }

    /// Stream the message belongs to (None for state)
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Schema { stream, .. } | Self::Record { stream, .. } => Some(stream),
            Self::State { .. } => None,
        }
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Check if this is a schema message
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }
}
