//! Output module
//!
//! Message types written to stdout during a sync and the writers that
//! deliver them.
//!
//! # Overview
//!
//! - `Message` - SCHEMA / RECORD / STATE, serialized as one JSON line each
//! - `MessageWriter` - sink trait, with `StdoutWriter` for the binary and
//!   `MemoryWriter` for tests

mod message;
mod writer;

pub use message::Message;
pub use writer::{MemoryWriter, MessageWriter, StdoutWriter};
