//! State manager implementation
//!
//! Holds the run's state container and writes it to disk on every mutation,
//! so the file always reflects the last persisted bookmark.

use super::types::{Bookmark, State};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// State manager for persisting and loading state
#[derive(Debug)]
pub struct StateManager {
    /// Where every mutation is written (empty = memory only)
    path: PathBuf,
    /// Current state
    state: Arc<RwLock<State>>,
}

impl StateManager {
    /// Create a state manager that persists to `path`, starting empty
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_state(State::new()).persist_to(path)
    }

    /// Create an in-memory state manager (no file persistence)
    pub fn in_memory() -> Self {
        Self::with_state(State::new())
    }

    /// Create an in-memory state manager seeded with `state`
    pub fn with_state(state: State) -> Self {
        Self {
            path: PathBuf::new(),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Load state from a file; a missing file yields an empty state.
    ///
    /// The returned manager does not write anywhere until
    /// [`persist_to`](Self::persist_to) is called.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;
            parse_state(&contents)?
        } else {
            State::new()
        };

        Ok(Self::with_state(state))
    }

    /// Create a state manager from an inline JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::with_state(parse_state(json)?))
    }

    /// Write every future mutation to `path`
    #[must_use]
    pub fn persist_to(mut self, path: impl AsRef<Path>) -> Self {
        self.path = path.as_ref().to_path_buf();
        self
    }

    /// Reload state from the configured path
    pub async fn load(&self) -> Result<()> {
        if self.is_in_memory() || !self.path.exists() {
            return Ok(());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;
        let loaded_state = parse_state(&contents)?;

        let mut state = self.state.write().await;
        *state = loaded_state;

        Ok(())
    }

    /// Save current state to the configured path
    pub async fn save(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }

        let state = self.state.read().await;
        let contents = serde_json::to_string_pretty(&*state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))?;

        Ok(())
    }

    /// Clone of the current state
    pub async fn snapshot(&self) -> State {
        self.state.read().await.clone()
    }

    /// Bookmark for a stream (empty when the stream has none)
    pub async fn bookmark(&self, stream: &str) -> Bookmark {
        self.state
            .read()
            .await
            .bookmark(stream)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace a stream's bookmark, persist, and return the new state
    pub async fn set_bookmark(&self, stream: &str, bookmark: Bookmark) -> Result<State> {
        {
            let mut state = self.state.write().await;
            state.set_bookmark(stream, bookmark);
        }
        self.commit().await
    }

    /// Stream marked as in progress, if any
    pub async fn current_stream(&self) -> Option<String> {
        self.state.read().await.current_stream.clone()
    }

    /// Set or clear the in-progress stream, persist, and return the new state
    pub async fn set_current_stream(&self, stream: Option<&str>) -> Result<State> {
        {
            let mut state = self.state.write().await;
            state.current_stream = stream.map(ToString::to_string);
        }
        self.commit().await
    }

    async fn commit(&self) -> Result<State> {
        self.save().await?;
        Ok(self.snapshot().await)
    }

    /// Export state as JSON string
    pub async fn to_json(&self) -> Result<String> {
        let state = self.state.read().await;
        serde_json::to_string(&*state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

fn parse_state(contents: &str) -> Result<State> {
    if contents.trim().is_empty() {
        return Ok(State::new());
    }
    serde_json::from_str(contents)
        .map_err(|e| Error::state(format!("Failed to parse state: {e}")))
}
