//! Message writers

use super::message::Message;
use crate::error::Result;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Sink for output messages
pub trait MessageWriter: Send + Sync {
    /// Write one message
    fn write(&self, message: &Message) -> Result<()>;
}

/// Writes one JSON line per message to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutWriter;

impl StdoutWriter {
    /// Create a stdout writer
    pub fn new() -> Self {
        Self
    }
}

impl MessageWriter for StdoutWriter {
    fn write(&self, message: &Message) -> Result<()> {
        let line = serde_json::to_string(message)?;
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{line}")?;
        handle.flush()?;
        Ok(())
    }
}

/// Collects messages in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryWriter {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl MemoryWriter {
    /// Create an empty memory writer
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages written so far
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Records written for `stream`
    pub fn records(&self, stream: &str) -> Vec<crate::types::JsonObject> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream: s, record, ..
                } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Values of all state messages, in order
    pub fn states(&self) -> Vec<crate::types::JsonValue> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::State { value } => Some(value),
                _ => None,
            })
            .collect()
    }
}

impl MessageWriter for MemoryWriter {
    fn write(&self, message: &Message) -> Result<()> {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.clone());
        }
        Ok(())
    }
}
