// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Solidafy Eloqua
//!
//! A Rust-native Eloqua source connector. Pulls accounts, contacts,
//! activities and custom objects through resumable bulk exports, and the
//! asset/visitor endpoints through the paged REST API.
//!
//! ## Features
//!
//! - **Resumable Exports**: bookmarks record the in-flight sync id and offset
//! - **Discovery**: catalog built from the instance's field metadata
//! - **OAuth2 Refresh**: rotated refresh tokens written back to the config
//! - **Retry / Rate Limiting**: transient failures retried with backoff
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_eloqua::{Catalog, EloquaClient, MemoryWriter, StateManager, SyncConfig, SyncEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> solidafy_eloqua::Result<()> {
//!     let client = Arc::new(EloquaClient::with_base_url(http, "https://secure.p01.eloqua.com"));
//!     let catalog = Catalog::from_file("catalog.json")?;
//!     let writer = Arc::new(MemoryWriter::new());
//!
//!     let mut engine = SyncEngine::new(client, StateManager::in_memory(), writer, config);
//!     let stats = engine.sync(&catalog).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     CLI (discover / sync)                    │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌───────────┬─────────────┬───┴──────────┬──────────┬──────────┐
//! │ Discover  │    Sync     │   Catalog    │  State   │  Output  │
//! ├───────────┼─────────────┼──────────────┼──────────┼──────────┤
//! │ Fields    │ Bulk export │ Selection    │ Bookmark │ SCHEMA   │
//! │ Custom    │ Polling     │ Resolver     │ Resume   │ RECORD   │
//! │ REST      │ REST pages  │ Statements   │ Atomic   │ STATE    │
//! └───────────┴─────────────┴──────────────┴──────────┴──────────┘
//!                               │
//! ┌──────────────────────────────────────────────────────────────┐
//! │        Client (base URL) → HTTP (retry, rate limit) → Auth   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and timestamp helpers
pub mod types;

/// Authentication and token refresh
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Eloqua API client
pub mod client;

/// Connector configuration
pub mod config;

/// Catalog documents and stream resolution
pub mod catalog;

/// JSON schema types and record coercion
pub mod schema;

/// Catalog discovery
pub mod discover;

/// Bookmarks and state persistence
pub mod state;

/// SCHEMA / RECORD / STATE messages
pub mod output;

/// Sync engine
pub mod sync;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogEntry};
pub use client::{EloquaClient, Transport};
pub use config::TapConfig;
pub use discover::DiscoveryContext;
pub use output::{MemoryWriter, Message, MessageWriter, StdoutWriter};
pub use state::{Bookmark, StateManager};
pub use sync::{SyncConfig, SyncEngine, SyncStats};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
