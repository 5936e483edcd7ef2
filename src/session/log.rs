//! Append-only ingestion log.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::TableId;

/// Outcome recorded for one completed commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogStatus {
    Success,
    Failed,
}

/// One durable record per completed commit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionLogEntry {
    pub id: Uuid,
    pub resource_id: String,
    pub table: TableId,
    pub file_name: String,
    /// Rows committed (0 on failure).
    pub row_count: usize,
    pub status: LogStatus,
    pub ingested_at: DateTime<Utc>,
}

impl IngestionLogEntry {
    pub fn success(
        resource_id: impl Into<String>,
        table: TableId,
        file_name: impl Into<String>,
        row_count: usize,
    ) -> Self {
        Self::new(resource_id, table, file_name, row_count, LogStatus::Success)
    }

    pub fn failed(
        resource_id: impl Into<String>,
        table: TableId,
        file_name: impl Into<String>,
    ) -> Self {
        Self::new(resource_id, table, file_name, 0, LogStatus::Failed)
    }

    fn new(
        resource_id: impl Into<String>,
        table: TableId,
        file_name: impl Into<String>,
        row_count: usize,
        status: LogStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource_id: resource_id.into(),
            table,
            file_name: file_name.into(),
            row_count,
            status,
            ingested_at: Utc::now(),
        }
    }
}

/// Write-only destination for [`IngestionLogEntry`] records.
pub trait LogSink: Send + Sync {
    fn append(&self, entry: &IngestionLogEntry) -> io::Result<()>;
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<IngestionLogEntry>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries appended so far, oldest first.
    pub fn entries(&self) -> Vec<IngestionLogEntry> {
        self.entries.lock().expect("log sink lock poisoned").clone()
    }
}

impl LogSink for MemoryLogSink {
    fn append(&self, entry: &IngestionLogEntry) -> io::Result<()> {
        self.entries
            .lock()
            .expect("log sink lock poisoned")
            .push(entry.clone());
        Ok(())
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonlLogSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlLogSink {
    /// Create a sink that appends to `path` (created on first write).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for JsonlLogSink {
    fn append(&self, entry: &IngestionLogEntry) -> io::Result<()> {
        let line = serde_json::to_string(entry).map_err(io::Error::other)?;
        let _guard = self.lock.lock().expect("log sink lock poisoned");
        let mut f = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(f, "{line}")
    }
}
