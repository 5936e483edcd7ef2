//! Observer hooks for preview and commit outcomes.
//!
//! Sessions report every preview failure and every completed commit attempt to an optional
//! [`IngestionObserver`]. Failures are classified by [`severity_for_error`]; those at or above
//! the configured threshold are also raised through [`IngestionObserver::on_alert`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CommitError, IngestError};
use crate::ingestion::FileFormat;
use crate::types::TableId;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Operator-correctable problem (validation).
    Warning,
    /// Operation failed.
    Error,
    /// Environment defect that must not go unnoticed (non-atomic destination).
    Critical,
}

/// Which pipeline step produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStage {
    Preview,
    Commit,
}

/// Context about one upload.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    pub stage: IngestionStage,
    pub resource_id: String,
    pub file_name: String,
    pub format: FileFormat,
    /// Destination table (known once a source and resource are selected).
    pub table: TableId,
}

/// Stats reported on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Rows previewed-and-prepared or committed.
    pub rows: usize,
    /// Store attempts made (0 for previews).
    pub attempts: u32,
}

/// Observer interface for ingestion outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called when a preview or commit succeeds.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called when a preview or commit fails.
    fn on_failure(
        &self,
        _ctx: &IngestionContext,
        _severity: IngestionSeverity,
        _error: &IngestError,
    ) {
    }

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits ingestion events as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        tracing::info!(
            stage = ?ctx.stage,
            resource = %ctx.resource_id,
            table = %ctx.table,
            file = %ctx.file_name,
            format = %ctx.format,
            rows = stats.rows,
            attempts = stats.attempts,
            "ingestion ok"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestError) {
        tracing::warn!(
            stage = ?ctx.stage,
            ?severity,
            resource = %ctx.resource_id,
            table = %ctx.table,
            file = %ctx.file_name,
            format = %ctx.format,
            %error,
            "ingestion failed"
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestError) {
        tracing::error!(
            stage = ?ctx.stage,
            ?severity,
            resource = %ctx.resource_id,
            table = %ctx.table,
            file = %ctx.file_name,
            format = %ctx.format,
            %error,
            "ALERT: ingestion failed"
        );
    }
}

/// Classify a failure for observers and alerting.
pub fn severity_for_error(e: &IngestError) -> IngestionSeverity {
    match e {
        IngestError::Validation(_) => IngestionSeverity::Warning,
        IngestError::Input(_) => IngestionSeverity::Error,
        IngestError::Configuration(_) => IngestionSeverity::Error,
        IngestError::InvalidTransition { .. } => IngestionSeverity::Warning,
        IngestError::Commit(err) => match err {
            CommitError::PartialFailure(_) => IngestionSeverity::Critical,
            CommitError::Transient { .. } | CommitError::Permanent(_) => IngestionSeverity::Error,
            CommitError::Cancelled => IngestionSeverity::Info,
        },
    }
}

/// Report `result` to `observer`, alerting when the failure severity reaches `alert_at_or_above`.
pub(crate) fn report(
    observer: Option<&Arc<dyn IngestionObserver>>,
    alert_at_or_above: IngestionSeverity,
    ctx: &IngestionContext,
    result: Result<IngestionStats, &IngestError>,
) {
    let Some(obs) = observer else {
        return;
    };
    match result {
        Ok(stats) => obs.on_success(ctx, stats),
        Err(e) => {
            let sev = severity_for_error(e);
            obs.on_failure(ctx, sev, e);
            if sev >= alert_at_or_above {
                obs.on_alert(ctx, sev, e);
            }
        }
    }
}
