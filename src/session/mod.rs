//! Ingestion session: the upload-to-commit state machine for one operator.
//!
//! ```text
//! Idle -> SourceSelected -> ResourceSelected -> FileAttached -> Previewing -> Committing
//!                                                                              |-> Succeeded
//!                                                                              '-> Failed
//! ```
//!
//! Selecting a source (from any state but `Committing`) invalidates everything downstream;
//! selecting a resource clears the file and manual values. Once the log entry for a commit is
//! written the session returns to `Idle`; the terminal state stays readable through
//! [`IngestionSession::last_outcome`].

mod log;

pub use log::{IngestionLogEntry, JsonlLogSink, LogSink, LogStatus, MemoryLogSink};

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::commit::{
    CancelHandle, CommitCoordinator, CommitProgress, CommitProgressSnapshot, CommitReceipt,
};
use crate::config::IngestionOptions;
use crate::error::{CommitError, ConfigError, IngestError, IngestResult};
use crate::ingestion::FileFormat;
use crate::observability::{
    report, IngestionContext, IngestionObserver, IngestionStage, IngestionStats,
};
use crate::processing::{prepare, Preview};
use crate::registry::{Resource, SchemaRegistry, Source};
use crate::types::{ManualValues, TableId, TransformedRowSet};

/// Lifecycle state of an [`IngestionSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    SourceSelected,
    ResourceSelected,
    FileAttached,
    Previewing,
    Committing,
    Succeeded,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::SourceSelected => "source selected",
            Self::ResourceSelected => "resource selected",
            Self::FileAttached => "file attached",
            Self::Previewing => "previewing",
            Self::Committing => "committing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        })
    }
}

/// An uploaded file: its original name and raw bytes.
///
/// The name is informational; the format always comes from the resource configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping its file name.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, fs::read(path)?))
    }
}

/// Drives one upload-to-commit cycle against a registry, a commit coordinator, and a log sink.
pub struct IngestionSession {
    registry: Arc<dyn SchemaRegistry>,
    coordinator: Arc<CommitCoordinator>,
    log_sink: Arc<dyn LogSink>,
    options: IngestionOptions,
    observer: Option<Arc<dyn IngestionObserver>>,

    state: SessionState,
    last_outcome: Option<SessionState>,
    source: Option<Source>,
    resource: Option<Resource>,
    file: Option<UploadedFile>,
    manual_values: ManualValues,
    prepared: Option<TransformedRowSet>,
    cancel: CancelHandle,
    progress: Arc<CommitProgress>,
}

impl fmt::Debug for IngestionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionSession")
            .field("state", &self.state)
            .field("source", &self.source.as_ref().map(|s| &s.id))
            .field("resource", &self.resource.as_ref().map(|r| &r.id))
            .field("file", &self.file.as_ref().map(|f| &f.name))
            .field("manual_values", &self.manual_values)
            .finish_non_exhaustive()
    }
}

impl IngestionSession {
    /// Create an idle session with default options and no observer.
    pub fn new(
        registry: Arc<dyn SchemaRegistry>,
        coordinator: Arc<CommitCoordinator>,
        log_sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            registry,
            coordinator,
            log_sink,
            options: IngestionOptions::default(),
            observer: None,
            state: SessionState::Idle,
            last_outcome: None,
            source: None,
            resource: None,
            file: None,
            manual_values: ManualValues::new(),
            prepared: None,
            cancel: CancelHandle::new(),
            progress: Arc::new(CommitProgress::new()),
        }
    }

    pub fn with_options(mut self, options: IngestionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn IngestionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `Succeeded` or `Failed` for the most recent commit, until the next source is selected.
    pub fn last_outcome(&self) -> Option<SessionState> {
        self.last_outcome
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.id.as_str())
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource.as_ref().map(|r| r.id.as_str())
    }

    pub fn file(&self) -> Option<&UploadedFile> {
        self.file.as_ref()
    }

    pub fn manual_values(&self) -> &ManualValues {
        &self.manual_values
    }

    /// Format the attached file will be decoded as.
    pub fn expected_format(&self) -> Option<FileFormat> {
        self.resource.as_ref().map(|r| r.config.format)
    }

    /// Destination of the selected resource.
    pub fn table_id(&self) -> Option<TableId> {
        match (&self.source, &self.resource) {
            (Some(s), Some(r)) => Some(TableId::for_resource(s, r)),
            _ => None,
        }
    }

    /// Live commit counters, shareable with another thread.
    pub fn progress(&self) -> Arc<CommitProgress> {
        Arc::clone(&self.progress)
    }

    pub fn progress_snapshot(&self) -> CommitProgressSnapshot {
        self.progress.snapshot()
    }

    /// Handle that stops retries of the current or next commit from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Choose a source. Clears resource, file, manual values, and any prepared rows.
    pub fn select_source(&mut self, source_id: &str) -> IngestResult<()> {
        self.ensure_not_committing("select a source")?;
        let source = self.registry.source(source_id)?;
        self.reset();
        tracing::debug!(source = %source.id, "source selected");
        self.source = Some(source);
        self.state = SessionState::SourceSelected;
        Ok(())
    }

    /// Choose a resource of the selected source. Clears file and manual values.
    pub fn select_resource(&mut self, resource_id: &str) -> IngestResult<()> {
        let source_id = match (self.state, &self.source) {
            (
                SessionState::SourceSelected
                | SessionState::ResourceSelected
                | SessionState::FileAttached
                | SessionState::Previewing,
                Some(source),
            ) => source.id.clone(),
            _ => return Err(self.invalid("select a resource")),
        };

        let resource = self.registry.active_resource(resource_id)?;
        if resource.source_id != source_id {
            return Err(ConfigError::ResourceSourceMismatch {
                resource: resource.id,
                source_id,
            }
            .into());
        }

        tracing::debug!(
            resource = %resource.id,
            format = %resource.config.format,
            "resource selected"
        );
        self.resource = Some(resource);
        self.clear_file();
        self.state = SessionState::ResourceSelected;
        Ok(())
    }

    /// Attach (or replace) the file to ingest.
    pub fn attach_file(&mut self, file: UploadedFile) -> IngestResult<()> {
        match self.state {
            SessionState::ResourceSelected
            | SessionState::FileAttached
            | SessionState::Previewing => {}
            _ => return Err(self.invalid("attach a file")),
        }
        tracing::debug!(file = %file.name, bytes = file.bytes.len(), "file attached");
        self.file = Some(file);
        self.prepared = None;
        self.state = SessionState::FileAttached;
        Ok(())
    }

    /// Set one manual value by target column. A stale preview is discarded.
    pub fn set_manual_value(
        &mut self,
        target: impl Into<String>,
        value: impl Into<String>,
    ) -> IngestResult<()> {
        self.ensure_file_attached("set a manual value")?;
        self.manual_values.insert(target.into(), value.into());
        self.invalidate_preview();
        Ok(())
    }

    /// Replace all manual values.
    pub fn set_manual_values(&mut self, values: ManualValues) -> IngestResult<()> {
        self.ensure_file_attached("set manual values")?;
        self.manual_values = values;
        self.invalidate_preview();
        Ok(())
    }

    /// Parse, validate, and transform the attached file with the current manual values.
    ///
    /// On success the full row set is kept for [`Self::commit`] and a bounded preview is
    /// returned. On failure the state falls back according to the failure kind: validation keeps
    /// the file attached, an undecodable file is dropped, a configuration error ends the session.
    pub fn preview(&mut self) -> IngestResult<Preview> {
        self.ensure_file_attached("preview")?;
        let (Some(source), Some(resource), Some(file)) = (&self.source, &self.resource, &self.file)
        else {
            return Err(self.invalid("preview"));
        };
        let resource_id = resource.id.clone();
        let ctx = IngestionContext {
            stage: IngestionStage::Preview,
            resource_id: resource_id.clone(),
            file_name: file.name.clone(),
            format: resource.config.format,
            table: TableId::for_resource(source, resource),
        };

        // Always validate against the current configuration, not the one seen at selection.
        let outcome = self
            .registry
            .active_resource(&resource_id)
            .map_err(IngestError::from)
            .and_then(|current| {
                let rows =
                    prepare(&file.bytes, &current.config, &self.manual_values, &self.options)?;
                Ok((current, rows))
            });

        match outcome {
            Ok((current, rows)) => {
                let preview = Preview::of(&rows, self.options.preview_rows);
                report(
                    self.observer.as_ref(),
                    self.options.alert_at_or_above,
                    &ctx,
                    Ok(IngestionStats {
                        rows: rows.row_count(),
                        attempts: 0,
                    }),
                );
                tracing::debug!(
                    resource = %resource_id,
                    rows = rows.row_count(),
                    columns = rows.columns.len(),
                    "preview ready"
                );
                self.resource = Some(current);
                self.prepared = Some(rows);
                self.cancel = CancelHandle::new();
                self.state = SessionState::Previewing;
                Ok(preview)
            }
            Err(e) => {
                report(
                    self.observer.as_ref(),
                    self.options.alert_at_or_above,
                    &ctx,
                    Err(&e),
                );
                match &e {
                    IngestError::Validation(_) => {}
                    IngestError::Input(_) => {
                        self.clear_file();
                        self.state = SessionState::ResourceSelected;
                    }
                    _ => self.reset(),
                }
                Err(e)
            }
        }
    }

    /// Commit the previewed rows and record exactly one log entry for the outcome.
    ///
    /// If the cancel handle fires before the first attempt is dispatched, nothing is written, no
    /// log entry is recorded, and the session returns to `Idle`.
    pub fn commit(&mut self) -> IngestResult<CommitReceipt> {
        if self.state != SessionState::Previewing {
            return Err(self.invalid("commit"));
        }
        let (Some(source), Some(resource), Some(file), Some(rows)) =
            (&self.source, &self.resource, &self.file, &self.prepared)
        else {
            return Err(self.invalid("commit"));
        };

        let table = TableId::for_resource(source, resource);
        let ctx = IngestionContext {
            stage: IngestionStage::Commit,
            resource_id: resource.id.clone(),
            file_name: file.name.clone(),
            format: resource.config.format,
            table: table.clone(),
        };
        self.state = SessionState::Committing;

        let result = self
            .coordinator
            .commit_with(&table, rows, &self.cancel, &self.progress);

        match result {
            Ok(receipt) => {
                self.append_log(IngestionLogEntry::success(
                    &ctx.resource_id,
                    table,
                    &ctx.file_name,
                    receipt.rows,
                ));
                report(
                    self.observer.as_ref(),
                    self.options.alert_at_or_above,
                    &ctx,
                    Ok(IngestionStats {
                        rows: receipt.rows,
                        attempts: receipt.attempts,
                    }),
                );
                self.finish(SessionState::Succeeded);
                Ok(receipt)
            }
            Err(CommitError::Cancelled) => {
                tracing::debug!(%table, "commit cancelled before dispatch");
                self.reset();
                Err(CommitError::Cancelled.into())
            }
            Err(err) => {
                self.append_log(IngestionLogEntry::failed(&ctx.resource_id, table, &ctx.file_name));
                let err = IngestError::from(err);
                report(
                    self.observer.as_ref(),
                    self.options.alert_at_or_above,
                    &ctx,
                    Err(&err),
                );
                self.finish(SessionState::Failed);
                Err(err)
            }
        }
    }

    /// Abandon the session.
    pub fn cancel(&mut self) -> IngestResult<()> {
        self.ensure_not_committing("cancel")?;
        self.cancel.cancel();
        self.reset();
        Ok(())
    }

    /// Return to `Idle`, discarding every selection.
    pub fn reset(&mut self) {
        self.source = None;
        self.resource = None;
        self.clear_file();
        self.cancel = CancelHandle::new();
        self.last_outcome = None;
        self.state = SessionState::Idle;
    }

    fn finish(&mut self, outcome: SessionState) {
        tracing::debug!(%outcome, "session finished");
        self.reset();
        self.last_outcome = Some(outcome);
    }

    fn append_log(&self, entry: IngestionLogEntry) {
        if let Err(e) = self.log_sink.append(&entry) {
            tracing::error!(
                entry_id = %entry.id,
                table = %entry.table,
                status = ?entry.status,
                error = %e,
                "failed to write ingestion log entry"
            );
        }
    }

    fn clear_file(&mut self) {
        self.file = None;
        self.manual_values.clear();
        self.prepared = None;
    }

    fn invalidate_preview(&mut self) {
        if self.state == SessionState::Previewing {
            self.prepared = None;
            self.state = SessionState::FileAttached;
        }
    }

    fn ensure_file_attached(&self, action: &'static str) -> IngestResult<()> {
        match self.state {
            SessionState::FileAttached | SessionState::Previewing => Ok(()),
            _ => Err(self.invalid(action)),
        }
    }

    fn ensure_not_committing(&self, action: &'static str) -> IngestResult<()> {
        if self.state == SessionState::Committing {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> IngestError {
        IngestError::InvalidTransition {
            action,
            state: self.state,
        }
    }
}
