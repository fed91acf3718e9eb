//! State management module
//!
//! Handles bookmarks, the in-progress stream marker, and persistence.
//! State is written on every mutation so an interrupted run can resume.
//!
//! # Overview
//!
//! The state module provides:
//! - `Bookmark` - Per-stream cursor plus the in-flight export position
//! - `State` - Container of all bookmarks and the `current_stream` marker
//! - `StateManager` - File-backed persistence with atomic writes

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{Bookmark, ExportProgress, State};
