//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs:
//!
//! ```json
//! {
//!   "bookmarks": {
//!     "contacts": { "datetime": "2019-01-01T00:00:00Z", "sync_id": "123", "offset": 5000 }
//!   },
//!   "current_stream": "contacts"
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Complete state for a connector run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream bookmarks
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Bookmark>,

    /// Stream being synced when the state was written, if any
    #[serde(default)]
    pub current_stream: Option<String>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the bookmark for a stream
    pub fn bookmark(&self, stream: &str) -> Option<&Bookmark> {
        self.bookmarks.get(stream)
    }

    /// Replace the bookmark for a stream
    pub fn set_bookmark(&mut self, stream: &str, bookmark: Bookmark) {
        self.bookmarks.insert(stream.to_string(), bookmark);
    }

    /// Get the cursor for a stream
    pub fn cursor(&self, stream: &str) -> Option<&str> {
        self.bookmarks.get(stream)?.datetime()
    }
}

/// Position inside an in-flight bulk export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportProgress {
    /// Vendor sync id
    pub sync_id: String,
    /// Next page offset to request
    pub offset: u64,
}

/// Per-stream progress marker.
///
/// The export reference and its offset live in one optional value so a
/// bookmark can never hold a `sync_id` without an `offset` or vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBookmark", into = "RawBookmark")]
pub struct Bookmark {
    datetime: Option<String>,
    export: Option<ExportProgress>,
}

impl Bookmark {
    /// Bookmark holding only a cursor value
    pub fn at(datetime: impl Into<String>) -> Self {
        Self {
            datetime: Some(datetime.into()),
            export: None,
        }
    }

    /// Cursor value safe to resume from
    pub fn datetime(&self) -> Option<&str> {
        self.datetime.as_deref()
    }

    /// In-flight export, if any
    pub fn export(&self) -> Option<&ExportProgress> {
        self.export.as_ref()
    }

    /// In-flight export id, if any
    pub fn sync_id(&self) -> Option<&str> {
        self.export.as_ref().map(|e| e.sync_id.as_str())
    }

    /// Offset of the in-flight export, if any
    pub fn offset(&self) -> Option<u64> {
        self.export.as_ref().map(|e| e.offset)
    }

    /// Copy of this bookmark pointing at `offset` of export `sync_id`
    #[must_use]
    pub fn with_export(&self, sync_id: impl Into<String>, offset: u64) -> Self {
        Self {
            datetime: self.datetime.clone(),
            export: Some(ExportProgress {
                sync_id: sync_id.into(),
                offset,
            }),
        }
    }

    /// Copy of this bookmark with the export dropped and the cursor unchanged
    #[must_use]
    pub fn without_export(&self) -> Self {
        Self {
            datetime: self.datetime.clone(),
            export: None,
        }
    }

    /// Copy of this bookmark with a new cursor and the export dropped
    #[must_use]
    pub fn finished(&self, datetime: impl Into<String>) -> Self {
        Self {
            datetime: Some(datetime.into()),
            export: None,
        }
    }
}

/// On-disk shape of a bookmark
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawBookmark {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sync_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<u64>,
}

impl TryFrom<RawBookmark> for Bookmark {
    type Error = String;

    fn try_from(raw: RawBookmark) -> Result<Self, Self::Error> {
        let sync_id = match raw.sync_id {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(other) => return Err(format!("invalid sync_id in bookmark: {other}")),
        };

        let export = match (sync_id, raw.offset) {
            (Some(sync_id), Some(offset)) => Some(ExportProgress { sync_id, offset }),
            (None, None) => None,
            (Some(sync_id), None) => {
                return Err(format!("bookmark has sync_id {sync_id} but no offset"))
            }
            (None, Some(offset)) => {
                return Err(format!("bookmark has offset {offset} but no sync_id"))
            }
        };

        Ok(Self {
            datetime: raw.datetime,
            export,
        })
    }
}

impl From<Bookmark> for RawBookmark {
    fn from(bookmark: Bookmark) -> Self {
        let (sync_id, offset) = match bookmark.export {
            Some(ExportProgress { sync_id, offset }) => (Some(Value::String(sync_id)), Some(offset)),
            None => (None, None),
        };
        Self {
            datetime: bookmark.datetime,
            sync_id,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_state_default() {
        let state = State::new();
        assert!(state.bookmarks.is_empty());
        assert!(state.current_stream.is_none());
    }

    #[test]
    fn test_bookmark_export_lifecycle() {
        let bookmark = Bookmark::at("2019-01-01T00:00:00Z");
        assert!(bookmark.export().is_none());

        let running = bookmark.with_export("123", 5000);
        assert_eq!(running.sync_id(), Some("123"));
        assert_eq!(running.offset(), Some(5000));
        assert_eq!(running.datetime(), Some("2019-01-01T00:00:00Z"));

        let done = running.finished("2019-02-01T00:00:00Z");
        assert!(done.sync_id().is_none());
        assert!(done.offset().is_none());
        assert_eq!(done.datetime(), Some("2019-02-01T00:00:00Z"));
    }

    #[test]
    fn test_bookmark_serialization() {
        let bookmark = Bookmark::at("2019-01-01T00:00:00Z").with_export("123", 50000);
        assert_eq!(
            serde_json::to_value(&bookmark).unwrap(),
            json!({"datetime": "2019-01-01T00:00:00Z", "sync_id": "123", "offset": 50000})
        );

        let idle = bookmark.without_export();
        assert_eq!(
            serde_json::to_value(&idle).unwrap(),
            json!({"datetime": "2019-01-01T00:00:00Z"})
        );
    }

    #[test]
    fn test_bookmark_accepts_nulls_and_numeric_ids() {
        let bookmark: Bookmark =
            serde_json::from_value(json!({"datetime": "x", "sync_id": null, "offset": null}))
                .unwrap();
        assert!(bookmark.export().is_none());

        let bookmark: Bookmark =
            serde_json::from_value(json!({"sync_id": 77, "offset": 0})).unwrap();
        assert_eq!(bookmark.sync_id(), Some("77"));
        assert!(bookmark.datetime().is_none());
    }

    #[test]
    fn test_bookmark_rejects_half_set_export() {
        assert!(serde_json::from_value::<Bookmark>(json!({"sync_id": "1"})).is_err());
        assert!(serde_json::from_value::<Bookmark>(json!({"offset": 10})).is_err());
    }

    #[test]
    fn test_state_round_trip() {
        let mut state = State::new();
        state.set_bookmark("contacts", Bookmark::at("2019-01-01T00:00:00Z").with_export("9", 0));
        state.current_stream = Some("contacts".to_string());

        let json = serde_json::to_string(&state).unwrap();
        let restored: State = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, state);
        assert_eq!(restored.cursor("contacts"), Some("2019-01-01T00:00:00Z"));
    }
}
