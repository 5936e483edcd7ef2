//! `bronze-ingest` is a configuration-driven ingestion pipeline for the Bronze layer of a data
//! warehouse: operators upload report files (Excel, CSV, HTML, JSON, Parquet) exported by external
//! systems, and every row lands as text in a table derived from the file's registered resource.
//!
//! The primary entrypoint is [`session::IngestionSession`], which walks one upload through
//! source/resource selection, preview, and commit, and records one [`session::IngestionLogEntry`]
//! per completed commit.
//!
//! ## Pipeline
//!
//! 1. [`ingestion::parse`]: bytes + declared [`ingestion::FileFormat`] -> [`types::ParsedFile`]
//! 2. [`processing::validate`]: collect every schema violation (manual fields, headers, emptiness)
//! 3. [`processing::transform`]: [`sanitize::sanitize`] every header, append manual fields
//! 4. [`commit::CommitCoordinator`]: atomic, idempotent, retried append to a [`commit::TableStore`]
//!
//! Steps 1-3 are pure; [`processing::prepare`] runs them together.
//!
//! ## Quick example: one upload end to end
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use bronze_ingest::commit::{CommitCoordinator, MemoryTableStore};
//! use bronze_ingest::config::RetryPolicy;
//! use bronze_ingest::ingestion::FileFormat;
//! use bronze_ingest::registry::{
//!     Category, FieldType, InMemoryRegistry, ManualField, Resource, ResourceConfig, Source,
//! };
//! use bronze_ingest::session::{IngestionSession, MemoryLogSink, UploadedFile};
//! use bronze_ingest::types::TableId;
//!
//! # fn main() -> Result<(), bronze_ingest::IngestError> {
//! let registry = InMemoryRegistry::new();
//! registry.upsert_source(Source::new("src-1", "Trendyol", "trendyol"))?;
//! registry.upsert_resource(Resource {
//!     id: "res-1".into(),
//!     source_id: "src-1".into(),
//!     display_name: "Order List".into(),
//!     technical_name: "orders".into(),
//!     category: Category::Portal,
//!     active: true,
//!     config: ResourceConfig::new(
//!         FileFormat::Csv,
//!         vec![ManualField::new("Report Date", FieldType::Date, true)],
//!     ),
//! })?;
//!
//! let store = Arc::new(MemoryTableStore::new());
//! let log = Arc::new(MemoryLogSink::new());
//! let coordinator = CommitCoordinator::new(store.clone(), RetryPolicy::default());
//! let mut session = IngestionSession::new(Arc::new(registry), Arc::new(coordinator), log.clone());
//!
//! session.select_source("src-1")?;
//! session.select_resource("res-1")?;
//! session.attach_file(UploadedFile::new("orders.csv", "id,amount\n101,50\n102,75\n"))?;
//! session.set_manual_value("report_date", "2023-10-27")?;
//!
//! let preview = session.preview()?;
//! assert_eq!(preview.columns, vec!["id", "amount", "report_date"]);
//!
//! let receipt = session.commit()?;
//! assert_eq!(receipt.rows, 2);
//! assert_eq!(store.row_count(&TableId::new("trendyol", "portal_orders")), 2);
//! assert_eq!(log.entries().len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`sanitize`]: header -> identifier normalization
//! - [`registry`]: sources, resources, manual fields, and the schema registry
//! - [`ingestion`]: unified parsing entrypoint and format-specific decoders
//! - [`processing`]: validation, transformation, preview
//! - [`commit`]: commit coordinator and table stores
//! - [`session`]: the ingestion state machine and log sinks
//! - [`observability`]: observer hooks and alert severities
//! - [`config`]: pipeline options
//! - [`error`]: error taxonomy

pub mod commit;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod observability;
pub mod processing;
pub mod registry;
pub mod sanitize;
pub mod session;
pub mod types;

pub use error::{IngestError, IngestResult};
