//! Sync types
//!
//! Configuration, export job status, and run statistics.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Rows requested per bulk export page
pub const DEFAULT_PAGE_SIZE: u64 = 5000;

/// Rows requested per REST page
pub const DEFAULT_REST_PAGE_SIZE: u64 = 1000;

/// Exports requesting more fields than this are logged as errors
pub const MAX_EXPORT_FIELDS: usize = 250;

/// Export job polling bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// First sleep between status checks
    pub min_interval: Duration,
    /// Upper bound for any single sleep
    pub max_interval: Duration,
    /// Give up when the job is still not ready after this long
    pub deadline: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(300),
            deadline: Duration::from_secs(3600),
        }
    }
}

impl PollConfig {
    /// Set the first interval
    #[must_use]
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Set the interval cap
    #[must_use]
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Set the deadline
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Configuration for a sync run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Cursor used by streams that have no bookmark
    pub start_date: DateTime<Utc>,
    /// Rows per bulk export page
    pub page_size: u64,
    /// Rows per REST page
    pub rest_page_size: u64,
    /// Export polling bounds
    pub poll: PollConfig,
}

impl SyncConfig {
    /// Create a sync config starting at `start_date`
    pub fn new(start_date: DateTime<Utc>) -> Self {
        Self {
            start_date,
            page_size: DEFAULT_PAGE_SIZE,
            rest_page_size: DEFAULT_REST_PAGE_SIZE,
            poll: PollConfig::default(),
        }
    }

    /// Set bulk page size
    #[must_use]
    pub fn with_page_size(mut self, size: u64) -> Self {
        self.page_size = size;
        self
    }

    /// Set REST page size
    #[must_use]
    pub fn with_rest_page_size(mut self, size: u64) -> Self {
        self.rest_page_size = size;
        self
    }

    /// Set polling bounds
    #[must_use]
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }
}

/// Status of a vendor sync job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    /// Queued
    Pending,
    /// Running
    Active,
    /// Data ready
    Success,
    /// Anything else the vendor reports
    Failed(String),
}

impl ExportStatus {
    /// Classify a vendor status string
    pub fn parse(status: &str) -> Self {
        match status {
            "pending" => Self::Pending,
            "active" => Self::Active,
            "success" => Self::Success,
            other => Self::Failed(other.to_string()),
        }
    }

    /// Whether the job may still succeed
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    /// Vendor spelling
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Success => "success",
            Self::Failed(s) => s,
        }
    }
}

/// Statistics from a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Total records emitted
    pub records_synced: usize,
    /// Total data pages fetched
    pub pages_fetched: usize,
    /// Streams completed
    pub streams_synced: usize,
    /// Exports created
    pub exports_created: usize,
    /// Exports resumed from a bookmark
    pub exports_resumed: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add a page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }
}
