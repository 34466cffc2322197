//! Event Log
//!
//! Appends drained interaction events to durable storage. The engine never
//! reads these back; the log is an append-only feed for analytics.

use aita_core::InteractionEvent;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error("Failed to write event log {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A destination for drained interaction events.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink {
    /// Appends `events` in order and returns how many were written.
    fn append(&mut self, events: &[InteractionEvent]) -> Result<usize, EventLogError>;
}

/// Writes one JSON object per line, creating the file on first use.
#[derive(Debug, Clone)]
pub struct JsonlEventLog {
    path: PathBuf,
}

impl JsonlEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> EventLogError {
        EventLogError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl EventSink for JsonlEventLog {
    fn append(&mut self, events: &[InteractionEvent]) -> Result<usize, EventLogError> {
        if events.is_empty() {
            return Ok(0);
        }

        // Serialize everything first so a bad record never leaves a partial batch.
        let mut batch = String::new();
        for event in events {
            batch.push_str(&serde_json::to_string(event)?);
            batch.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.write_all(batch.as_bytes())
            .map_err(|e| self.io_error(e))?;
        Ok(events.len())
    }
}
