//! Paged REST endpoints
//!
//! `GET <path>?count&page&depth=complete&orderBy=<col>&search=<col>>='<since>'`,
//! pages numbered from 1, finished when a page comes back short.

use super::SyncEngine;
use crate::catalog::{StreamDescriptor, StreamKind};
use crate::error::{Error, Result};
use crate::output::Message;
use crate::state::Bookmark;
use crate::types::{format_bookmark, format_eloqua, parse_timestamp, parse_timestamp_str, JsonValue};
use tracing::{debug, info};

impl SyncEngine {
    /// Sync one REST stream from its bookmark
    #[tracing::instrument(skip_all, fields(stream = %descriptor.stream))]
    pub(crate) async fn sync_rest_stream(&mut self, descriptor: &StreamDescriptor) -> Result<String> {
        let StreamKind::Rest { endpoint } = &descriptor.kind else {
            return Err(Error::catalog(&descriptor.stream, "not a REST stream"));
        };
        let stream = descriptor.stream.as_str();
        let transformer = descriptor.transformer();
        let count = self.config.rest_page_size;

        let bookmark = self.state.bookmark(stream).await;
        let cursor = self.resume_cursor(&bookmark);
        let mut current = parse_timestamp_str(&cursor)
            .ok_or_else(|| Error::state(format!("{stream}: bad bookmark '{cursor}'")))?;
        let search = format!("{}>='{}'", endpoint.order_by, format_eloqua(&current));

        let mut page = 1_u64;
        let mut emitted = 0;
        loop {
            let params = [
                ("count", count.to_string()),
                ("page", page.to_string()),
                ("depth", "complete".to_string()),
                ("orderBy", endpoint.order_by.to_string()),
                ("search", search.clone()),
            ];
            let data = self.client.get(endpoint.path, &params, stream).await?;
            self.stats.add_page();

            let elements = match data.get("elements") {
                Some(JsonValue::Array(elements)) => elements.clone(),
                Some(JsonValue::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(Error::unexpected(
                        stream,
                        format!("elements is not an array: {other}"),
                    ))
                }
            };

            for element in &elements {
                let JsonValue::Object(row) = element else {
                    return Err(Error::unexpected(stream, format!("element is not an object: {element}")));
                };
                if let Some(ts) = row.get(endpoint.order_by).and_then(parse_timestamp) {
                    current = current.max(ts);
                }
                let record = transformer.transform(row.clone())?;
                self.writer.write(&Message::record(stream, record))?;
                emitted += 1;
            }

            if !elements.is_empty() {
                self.write_bookmark(stream, Bookmark::at(format_bookmark(&current)))
                    .await?;
            }

            debug!(page, rows = elements.len(), "Fetched REST page");
            if (elements.len() as u64) < count {
                break;
            }
            page += 1;
        }

        self.stats.add_records(emitted);
        let cursor = format_bookmark(&current);
        info!(records = emitted, cursor = %cursor, "REST sync complete");
        Ok(cursor)
    }
}
