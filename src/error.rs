use std::fmt;

use thiserror::Error;

use crate::registry::FieldType;
use crate::session::SessionState;

/// Convenience result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Error type returned by the ingestion pipeline and the session that drives it.
///
/// There is one variant per failure category; every category renders a distinct message so a
/// caller can show it to the operator unchanged.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Unknown/inactive resource or malformed schema. Fatal to the session.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The uploaded file could not be turned into rows.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// The file and/or manual values violate the resource schema.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The destination rejected or never acknowledged the batch.
    #[error("commit failed: {0}")]
    Commit(#[from] CommitError),

    /// A session operation was called out of order.
    #[error("cannot {action} while session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },
}

/// Schema registry / configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No record with this id exists (inactive resources are reported as missing
    /// `active resource`s).
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// A technical name or column target is not a canonical identifier.
    #[error("{field} '{value}' is not identifier-safe (expected '{suggested}')")]
    InvalidIdentifier {
        field: &'static str,
        value: String,
        suggested: String,
    },

    /// Two manual fields of one resource share a target column.
    #[error("manual field target '{0}' is declared more than once")]
    DuplicateTarget(String),

    /// A technical name is already taken in its scope.
    #[error("{kind} technical name '{name}' is already in use")]
    DuplicateTechnicalName { kind: &'static str, name: String },

    /// A referenced source's technical name cannot be changed.
    #[error("source '{id}' is referenced by resources; technical name '{name}' is immutable")]
    ImmutableTechnicalName { id: String, name: String },

    /// A source cannot be deleted while resources reference it.
    #[error("source '{id}' is still referenced by {resources} resource(s)")]
    SourceInUse { id: String, resources: usize },

    /// The resource selected does not belong to the selected source.
    #[error("resource '{resource}' does not belong to source '{source_id}'")]
    ResourceSourceMismatch { resource: String, source_id: String },

    /// A catalog or options document could not be read or decoded.
    #[error("failed to load '{path}': {message}")]
    Load { path: String, message: String },
}

/// Failures turning uploaded bytes into a [`crate::types::ParsedFile`].
#[derive(Debug, Error)]
pub enum InputError {
    /// The declared format token is unknown or has no registered decoder.
    #[error("unsupported format '{0}'")]
    UnsupportedFormat(String),

    /// The bytes are not a valid instance of the declared format.
    #[error("malformed {format} file: {message}")]
    MalformedFile { format: String, message: String },

    /// Decoding succeeded but produced no data rows.
    #[error("file contains no data rows")]
    EmptyFile,
}

impl InputError {
    pub(crate) fn malformed(format: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::MalformedFile {
            format: format.to_string(),
            message: message.to_string(),
        }
    }
}

/// One schema violation found by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("required field '{0}' has no value")]
    MissingRequiredField(String),

    #[error("value '{raw}' for '{target}' is not a valid {expected}")]
    TypeMismatch {
        target: String,
        expected: FieldType,
        raw: String,
    },

    #[error("file contains no data rows")]
    EmptyFile,

    #[error("header '{0}' sanitizes to an empty column name")]
    UnresolvableHeader(String),

    #[error("manual field '{0}' collides with a column of the file")]
    ColumnCollision(String),
}

/// Every violation found in one validation pass, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<Violation>);

impl ValidationErrors {
    /// Violations in the order they were found.
    pub fn violations(&self) -> &[Violation] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation(s)", self.0.len())?;
        for (i, v) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Outcome of a failed commit, after retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    /// Transport failures persisted through every attempt.
    #[error("destination unavailable after {attempts} attempt(s): {message}")]
    Transient { attempts: u32, message: String },

    /// The destination rejected the batch (e.g. schema conflict). Not retried.
    #[error("destination rejected batch: {0}")]
    Permanent(String),

    /// The destination could not guarantee atomicity. Environment defect.
    #[error("destination reported a partial write: {0}")]
    PartialFailure(String),

    /// Cancelled before any attempt was dispatched; nothing was written.
    #[error("commit cancelled before dispatch")]
    Cancelled,
}

/// Failures reported by a [`crate::commit::TableStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Network/timeout/IO; safe to retry with the same batch id.
    #[error("transient store error: {0}")]
    Transient(String),

    /// Shape conflict or other rejection; retrying cannot help.
    #[error("permanent store error: {0}")]
    Permanent(String),

    /// Some rows may be visible. Never retried.
    #[error("partial write: {0}")]
    Partial(String),
}
