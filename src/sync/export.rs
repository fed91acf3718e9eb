//! Export result pagination

use super::SyncEngine;
use crate::catalog::StreamDescriptor;
use crate::error::{Error, Result};
use crate::output::Message;
use crate::state::Bookmark;
use crate::types::{format_bookmark, parse_timestamp, parse_timestamp_str, JsonObject, JsonValue};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Turn a raw export row into a record: empty strings become `null`
pub fn normalize_row(row: JsonValue) -> Result<JsonObject> {
    match row {
        JsonValue::Object(obj) => Ok(obj
            .into_iter()
            .map(|(k, v)| match v {
                JsonValue::String(s) if s.is_empty() => (k, JsonValue::Null),
                other => (k, other),
            })
            .collect()),
        other => Err(Error::unexpected(
            "export_data",
            format!("expected an object row, got {other}"),
        )),
    }
}

/// Cursor after a completed export: the newest row time, never earlier than `prior`
pub(crate) fn final_cursor(prior: &str, newest: Option<DateTime<Utc>>) -> String {
    match (newest, parse_timestamp_str(prior)) {
        (Some(newest), Some(prior_dt)) if newest >= prior_dt => format_bookmark(&newest),
        (Some(newest), None) => format_bookmark(&newest),
        _ => prior.to_string(),
    }
}

impl SyncEngine {
    /// Walk an export's result pages from `starting_offset`, emitting records.
    ///
    /// The bookmark is written before each page request so a crash resumes at
    /// the page that was in flight. Returns the stream's new cursor.
    pub(crate) async fn paginate(
        &mut self,
        descriptor: &StreamDescriptor,
        sync_id: &str,
        starting_offset: u64,
        prior_cursor: &str,
    ) -> Result<String> {
        let stream = descriptor.stream.as_str();
        let transformer = descriptor.transformer();
        let page_size = self.config.page_size;
        let base = Bookmark::at(prior_cursor);
        let path = format!("/api/bulk/2.0/syncs/{sync_id}/data");

        let mut offset = starting_offset;
        let mut newest: Option<DateTime<Utc>> = None;
        let mut first_page = true;
        let mut emitted = 0;

        info!(sync_id, offset, "Pulling export results");

        loop {
            self.write_bookmark(stream, base.with_export(sync_id, offset))
                .await?;

            let params = [("limit", page_size.to_string()), ("offset", offset.to_string())];
            let page = match self.client.get(&path, &params, "export_data").await {
                Ok(page) => page,
                Err(e) if first_page && e.is_gone() => {
                    return Err(Error::ExportExpired {
                        sync_id: sync_id.to_string(),
                    })
                }
                Err(e) => return Err(e),
            };
            first_page = false;
            self.stats.add_page();

            let items = match page.get("items") {
                Some(JsonValue::Array(items)) => items.clone(),
                Some(JsonValue::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(Error::unexpected(
                        "export_data",
                        format!("items is not an array: {other}"),
                    ))
                }
            };

            for item in items {
                let row = normalize_row(item)?;
                if let Some(ts) = row.get(&descriptor.updated_at_field).and_then(parse_timestamp) {
                    newest = Some(newest.map_or(ts, |n| n.max(ts)));
                }
                let record = transformer.transform(row)?;
                self.writer.write(&Message::record(stream, record))?;
                emitted += 1;
            }

            let has_more = page
                .get("hasMore")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false);
            debug!(sync_id, offset, has_more, "Fetched export page");

            offset += page_size;
            if !has_more {
                break;
            }
        }

        self.stats.add_records(emitted);
        let cursor = final_cursor(prior_cursor, newest);
        self.write_bookmark(stream, base.finished(cursor.as_str()))
            .await?;

        info!(sync_id, records = emitted, cursor = %cursor, "Export complete");
        Ok(cursor)
    }
}
