//! CLI module
//!
//! Command-line interface for the connector.
//!
//! # Modes
//!
//! - `--discover` - print the catalog built from the instance's field metadata
//! - default - sync the streams selected in `--catalog`, emitting SCHEMA,
//!   RECORD and STATE messages on stdout

mod commands;
mod runner;

pub use commands::{Cli, Mode};
pub use runner::{grant_observer, sync_config, Runner};
