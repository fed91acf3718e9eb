//! Export job driver
//!
//! Creates (or resumes) one bulk export per stream, polls the sync job until
//! the vendor reports success, then hands over to pagination.

use super::backoff::next_poll_interval;
use super::types::{ExportStatus, MAX_EXPORT_FIELDS};
use super::SyncEngine;
use crate::catalog::{StreamDescriptor, StreamKind};
use crate::error::{Error, Result};
use crate::state::Bookmark;
use crate::types::{format_eloqua, parse_timestamp_str, JsonValue};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

static SYNC_URI: Lazy<Regex> = Lazy::new(|| Regex::new(r"/syncs/([0-9]+)").unwrap());

/// Sync id from a sync job `uri`
pub(crate) fn sync_id_from_uri(uri: &str) -> Option<&str> {
    SYNC_URI
        .captures(uri)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Bulk filter selecting rows updated at or after `cursor`
pub(crate) fn export_filter(descriptor: &StreamDescriptor, cursor: &str) -> Result<String> {
    let statement = descriptor.updated_at_statement().ok_or_else(|| {
        Error::catalog(
            &descriptor.stream,
            format!("no statement for {}", descriptor.updated_at_field),
        )
    })?;
    let since = parse_timestamp_str(cursor)
        .ok_or_else(|| Error::state(format!("{}: bad bookmark '{cursor}'", descriptor.stream)))?;

    let updated = format!("'{statement}' >= '{}'", format_eloqua(&since));
    Ok(match &descriptor.kind {
        StreamKind::Activity { activity_type } => {
            format!("{updated} AND '{{{{Activity.Type}}}}' = '{activity_type}'")
        }
        _ => updated,
    })
}

impl SyncEngine {
    /// Sync one bulk stream, resuming an in-flight export when the bookmark has one
    #[tracing::instrument(skip_all, fields(stream = %descriptor.stream))]
    pub(crate) async fn sync_bulk_stream(&mut self, descriptor: &StreamDescriptor) -> Result<String> {
        let stream = descriptor.stream.as_str();
        let bookmark = self.state.bookmark(stream).await;
        let cursor = self.resume_cursor(&bookmark);

        if let Some(export) = bookmark.export() {
            info!(sync_id = %export.sync_id, offset = export.offset, "Resuming export");
            self.stats.exports_resumed += 1;

            // Offset 0 may mean the run stopped while the job was still polling
            let ready = if export.offset == 0 {
                self.wait_for_export(descriptor, &export.sync_id, Instant::now())
                    .await
            } else {
                Ok(())
            };
            let resumed = match ready {
                Ok(()) => {
                    self.paginate(descriptor, &export.sync_id, export.offset, &cursor)
                        .await
                }
                Err(e) => Err(e),
            };
            match resumed {
                Err(Error::ExportExpired { sync_id }) => {
                    warn!(sync_id = %sync_id, "Export no longer available, starting a new one");
                    self.write_bookmark(stream, bookmark.without_export())
                        .await?;
                }
                result => return result,
            }
        }

        let sync_id = self.create_export(descriptor, &cursor).await?;
        let created = Instant::now();
        self.write_bookmark(stream, Bookmark::at(cursor.as_str()).with_export(sync_id.as_str(), 0))
            .await?;

        self.wait_for_export(descriptor, &sync_id, created).await?;
        self.paginate(descriptor, &sync_id, 0, &cursor).await
    }

    /// Create the export definition and its sync job, returning the sync id
    async fn create_export(&mut self, descriptor: &StreamDescriptor, cursor: &str) -> Result<String> {
        let stream = descriptor.stream.as_str();
        let object = descriptor
            .export_object()
            .ok_or_else(|| Error::catalog(stream, "stream is not a bulk object"))?;

        if descriptor.fields.len() > MAX_EXPORT_FIELDS {
            error!(
                fields = descriptor.fields.len(),
                max = MAX_EXPORT_FIELDS,
                "Export requests more fields than Eloqua allows, attempting anyway"
            );
        }

        let filter = export_filter(descriptor, cursor)?;
        let definition = self
            .client
            .post(
                &format!("/api/bulk/2.0/{object}/exports"),
                json!({
                    "name": format!("solidafy-eloqua {stream} - {}", Utc::now().to_rfc3339()),
                    "fields": descriptor.fields,
                    "filter": filter,
                    "areSystemTimestampsInUTC": true,
                }),
                "export_create_def",
            )
            .await?;
        let definition_uri = definition
            .get("uri")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::unexpected("export_create_def", "response has no uri"))?;

        let sync = self
            .client
            .post(
                "/api/bulk/2.0/syncs",
                json!({ "syncedInstanceUri": definition_uri }),
                "export_create_sync",
            )
            .await?;
        let sync_uri = sync.get("uri").and_then(JsonValue::as_str).unwrap_or("");
        let sync_id = sync_id_from_uri(sync_uri)
            .ok_or_else(|| {
                Error::unexpected("export_create_sync", format!("cannot read sync id from '{sync_uri}'"))
            })?
            .to_string();

        self.stats.exports_created += 1;
        info!(sync_id = %sync_id, filter = %filter, "Created export");
        Ok(sync_id)
    }

    /// Poll the sync job until it succeeds, fails, or runs past the deadline
    async fn wait_for_export(
        &self,
        descriptor: &StreamDescriptor,
        sync_id: &str,
        created: Instant,
    ) -> Result<()> {
        let stream = descriptor.stream.as_str();
        let poll = self.config.poll;
        let mut interval = Duration::ZERO;

        loop {
            let job = match self
                .client
                .get(&format!("/api/bulk/2.0/syncs/{sync_id}"), &[], "export_sync_poll")
                .await
            {
                Ok(job) => job,
                Err(e) if e.is_gone() => {
                    return Err(Error::ExportExpired {
                        sync_id: sync_id.to_string(),
                    })
                }
                Err(e) => return Err(e),
            };
            let status =
                ExportStatus::parse(job.get("status").and_then(JsonValue::as_str).unwrap_or(""));

            if status == ExportStatus::Success {
                return Ok(());
            }
            if !status.is_in_progress() {
                let err = Error::ExportFailed {
                    stream: stream.to_string(),
                    status: status.as_str().to_string(),
                };
                error!(sync_id, status = status.as_str(), "{err}");
                return Err(err);
            }
            if created.elapsed() > poll.deadline {
                let err = Error::ExportDeadline {
                    stream: stream.to_string(),
                    seconds: poll.deadline.as_secs(),
                };
                error!(sync_id, "{err}");
                return Err(err);
            }

            interval = next_poll_interval(interval, &poll);
            info!(
                sync_id,
                status = status.as_str(),
                sleep_ms = interval.as_millis() as u64,
                "Export not ready"
            );
            tokio::time::sleep(interval).await;
        }
    }
}
