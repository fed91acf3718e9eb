//! Sync engine module
//!
//! Drives selected streams in a fixed order and persists progress after every
//! step so an interrupted run resumes where it stopped.
//!
//! # Overview
//!
//! - `SyncEngine` - stream orchestration, bookmark writes, SCHEMA/STATE output
//! - `bulk` - export job creation, polling, and resume
//! - `export` - result pagination and record emission
//! - `rest` - paged REST endpoints
//!
//! Stream order: `accounts`, `contacts`, activity streams, custom objects
//! (catalog order), then the REST endpoints.

mod backoff;
mod bulk;
mod export;
mod rest;
mod types;

pub use backoff::next_poll_interval;
pub use export::normalize_row;
pub use types::{
    ExportStatus, PollConfig, SyncConfig, SyncStats, DEFAULT_PAGE_SIZE, DEFAULT_REST_PAGE_SIZE,
    MAX_EXPORT_FIELDS,
};

use crate::catalog::{
    activity_stream, resolve, Catalog, StreamDescriptor, ACTIVITY_TYPES, BUILT_IN_BULK_OBJECTS,
    REST_ENDPOINTS,
};
use crate::client::Transport;
use crate::error::Result;
use crate::output::{Message, MessageWriter};
use crate::state::{Bookmark, StateManager};
use crate::types::format_bookmark;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Sync engine for a single run
pub struct SyncEngine {
    /// Vendor API
    client: Arc<dyn Transport>,
    /// Bookmark store
    state: StateManager,
    /// Message sink
    writer: Arc<dyn MessageWriter>,
    /// Sync configuration
    config: SyncConfig,
    /// Statistics
    stats: SyncStats,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(
        client: Arc<dyn Transport>,
        state: StateManager,
        writer: Arc<dyn MessageWriter>,
        config: SyncConfig,
    ) -> Self {
        Self {
            client,
            state,
            writer,
            config,
            stats: SyncStats::default(),
        }
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Sync every selected stream in the catalog
    pub async fn sync(&mut self, catalog: &Catalog) -> Result<SyncStats> {
        let start = Instant::now();
        let order = sync_order(catalog);

        let resume_at = match self.state.current_stream().await {
            Some(current) => match order.iter().position(|s| *s == current) {
                Some(index) => {
                    info!(stream = %current, "Resuming interrupted run");
                    index
                }
                None => {
                    warn!(stream = %current, "Unknown current_stream in state, starting from the first stream");
                    0
                }
            },
            None => 0,
        };

        for stream in &order[resume_at..] {
            let Some(entry) = catalog.get_stream(stream) else {
                continue;
            };
            if !entry.is_selected() {
                continue;
            }

            let descriptor = resolve(entry)?;
            self.set_current_stream(Some(stream.as_str())).await?;
            self.write_schema(&descriptor)?;

            if descriptor.is_bulk() {
                self.sync_bulk_stream(&descriptor).await?;
            } else {
                self.sync_rest_stream(&descriptor).await?;
            }
            self.stats.streams_synced += 1;
        }

        self.set_current_stream(None).await?;

        self.stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            streams = self.stats.streams_synced,
            records = self.stats.records_synced,
            duration_ms = self.stats.duration_ms,
            "Sync complete"
        );
        Ok(self.stats.clone())
    }

    /// Persist a stream's bookmark and emit the resulting state
    pub(crate) async fn write_bookmark(&self, stream: &str, bookmark: Bookmark) -> Result<()> {
        let state = self.state.set_bookmark(stream, bookmark).await?;
        self.writer.write(&Message::state(&state))
    }

    async fn set_current_stream(&self, stream: Option<&str>) -> Result<()> {
        let state = self.state.set_current_stream(stream).await?;
        self.writer.write(&Message::state(&state))
    }

    fn write_schema(&self, descriptor: &StreamDescriptor) -> Result<()> {
        self.writer.write(&Message::schema(
            &descriptor.stream,
            descriptor.schema.to_json(),
            descriptor.key_properties.clone(),
            vec![descriptor.updated_at_field.clone()],
        ))
    }

    /// Cursor to resume `stream` from: its bookmark or the configured start date
    pub(crate) fn resume_cursor(&self, bookmark: &Bookmark) -> String {
        bookmark
            .datetime()
            .map_or_else(|| format_bookmark(&self.config.start_date), ToString::to_string)
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Every catalog stream in sync order
fn sync_order(catalog: &Catalog) -> Vec<String> {
    let mut order: Vec<String> = BUILT_IN_BULK_OBJECTS
        .iter()
        .map(ToString::to_string)
        .collect();
    order.extend(ACTIVITY_TYPES.iter().map(|t| activity_stream(t)));

    let fixed: Vec<&str> = REST_ENDPOINTS.iter().map(|e| e.stream).collect();
    let custom: Vec<String> = catalog
        .streams
        .iter()
        .map(|s| s.tap_stream_id.clone())
        .filter(|id| !order.contains(id) && !fixed.contains(&id.as_str()))
        .collect();
    order.extend(custom);
    order.extend(fixed.iter().map(ToString::to_string));
    order
}
