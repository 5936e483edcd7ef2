use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use bronze_ingest::commit::{CommitCoordinator, MemoryTableStore, TableStore};
use bronze_ingest::config::{IngestionOptions, RetryPolicy};
use bronze_ingest::error::{CommitError, IngestError, StoreError, Violation};
use bronze_ingest::ingestion::FileFormat;
use bronze_ingest::registry::{
    Category, FieldType, InMemoryRegistry, ManualField, Resource, ResourceConfig, SchemaRegistry,
    Source,
};
use bronze_ingest::session::{
    IngestionSession, JsonlLogSink, LogSink, LogStatus, MemoryLogSink, SessionState, UploadedFile,
};
use bronze_ingest::types::{TableId, TransformedRowSet};

const ORDERS_CSV: &str = "id,amount\n101,50\n102,75\n";

fn registry() -> InMemoryRegistry {
    let reg = InMemoryRegistry::new();
    reg.upsert_source(Source::new("src-1", "Trendyol", "trendyol")).unwrap();
    reg.upsert_source(Source::new("src-2", "Hepsiburada", "hepsiburada")).unwrap();
    reg.upsert_resource(Resource {
        id: "res-1".into(),
        source_id: "src-1".into(),
        display_name: "Order List".into(),
        technical_name: "orders".into(),
        category: Category::Portal,
        active: true,
        config: ResourceConfig::new(
            FileFormat::Csv,
            vec![
                ManualField::new("Report Date", FieldType::Date, true),
                ManualField::new("Batch Note", FieldType::Text, false),
            ],
        ),
    })
    .unwrap();
    reg
}

fn portal_orders() -> TableId {
    TableId::new("trendyol", "portal_orders")
}

struct Harness {
    session: IngestionSession,
    log: Arc<MemoryLogSink>,
}

fn harness(store: Arc<dyn TableStore>) -> Harness {
    let log = Arc::new(MemoryLogSink::new());
    let coordinator = CommitCoordinator::new(store, RetryPolicy::immediate(3));
    let session = IngestionSession::new(Arc::new(registry()), Arc::new(coordinator), log.clone());
    Harness { session, log }
}

fn ready_to_preview(session: &mut IngestionSession) {
    session.select_source("src-1").unwrap();
    session.select_resource("res-1").unwrap();
    session
        .attach_file(UploadedFile::new("orders.csv", ORDERS_CSV))
        .unwrap();
}

#[test]
fn manual_value_is_appended_to_every_row() {
    let store = Arc::new(MemoryTableStore::new());
    let mut h = harness(store.clone());
    ready_to_preview(&mut h.session);
    h.session.set_manual_value("report_date", "2023-10-27").unwrap();

    let preview = h.session.preview().unwrap();
    assert_eq!(preview.total_rows, 2);
    assert_eq!(preview.columns, vec!["id", "amount", "report_date", "batch_note"]);

    let receipt = h.session.commit().unwrap();
    assert_eq!(receipt.table, portal_orders());
    assert_eq!(h.session.state(), SessionState::Idle);
    assert_eq!(h.session.last_outcome(), Some(SessionState::Succeeded));

    let table = store.table(&portal_orders()).unwrap();
    assert_eq!(
        table.rows,
        vec![
            vec!["101", "50", "2023-10-27", ""],
            vec!["102", "75", "2023-10-27", ""],
        ]
    );
}

#[test]
fn missing_required_value_yields_exactly_one_violation() {
    let store = Arc::new(MemoryTableStore::new());
    let mut h = harness(store.clone());
    ready_to_preview(&mut h.session);

    let err = h.session.preview().unwrap_err();
    match err {
        IngestError::Validation(v) => assert_eq!(
            v.violations(),
            &[Violation::MissingRequiredField("report_date".into())]
        ),
        other => panic!("expected validation error, got {other}"),
    }
    assert_eq!(h.session.state(), SessionState::FileAttached);
    assert!(h.session.commit().is_err());
    assert_eq!(store.row_count(&portal_orders()), 0);
    assert!(h.log.entries().is_empty());
}

#[test]
fn all_violations_are_reported_in_one_pass() {
    let mut h = harness(Arc::new(MemoryTableStore::new()));
    h.session.select_source("src-1").unwrap();
    h.session.select_resource("res-1").unwrap();
    h.session
        .attach_file(UploadedFile::new("orders.csv", "id,???\n1,2\n"))
        .unwrap();
    h.session.set_manual_value("report_date", "27/10/2023").unwrap();

    let Err(IngestError::Validation(v)) = h.session.preview() else {
        panic!("expected validation failure");
    };
    assert_eq!(v.violations().len(), 2);
    assert!(v.to_string().contains("???"));
    assert!(v.to_string().contains("report_date"));
}

/// Transient on the first attempt, healthy afterwards.
struct FlakyStore {
    inner: MemoryTableStore,
    calls: AtomicU32,
}

impl TableStore for FlakyStore {
    fn append_rows(
        &self,
        table: &TableId,
        batch_id: Uuid,
        rows: &TransformedRowSet,
    ) -> Result<(), StoreError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(StoreError::Transient("connection reset".into()));
        }
        self.inner.append_rows(table, batch_id, rows)
    }
}

#[test]
fn retried_commit_logs_one_success_with_row_count() {
    let store = Arc::new(FlakyStore {
        inner: MemoryTableStore::new(),
        calls: AtomicU32::new(0),
    });
    let mut h = harness(store.clone());
    ready_to_preview(&mut h.session);
    h.session.set_manual_value("report_date", "2023-10-27").unwrap();
    h.session.preview().unwrap();

    let receipt = h.session.commit().unwrap();
    assert_eq!(receipt.attempts, 2);
    assert_eq!(h.session.progress_snapshot().attempts, 2);

    assert_eq!(store.inner.row_count(&portal_orders()), 2);
    let entries = h.log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, LogStatus::Success);
    assert_eq!(entries[0].row_count, 2);
    assert_eq!(entries[0].resource_id, "res-1");
    assert_eq!(entries[0].file_name, "orders.csv");
}

#[test]
fn failed_commit_logs_one_failure_with_zero_rows() {
    struct Rejecting;
    impl TableStore for Rejecting {
        fn append_rows(
            &self,
            _: &TableId,
            _: Uuid,
            _: &TransformedRowSet,
        ) -> Result<(), StoreError> {
            Err(StoreError::Permanent("column conflict".into()))
        }
    }

    let mut h = harness(Arc::new(Rejecting));
    ready_to_preview(&mut h.session);
    h.session.set_manual_value("report_date", "2023-10-27").unwrap();
    h.session.preview().unwrap();

    let err = h.session.commit().unwrap_err();
    assert!(matches!(err, IngestError::Commit(CommitError::Permanent(_))));
    assert_eq!(h.session.state(), SessionState::Idle);
    assert_eq!(h.session.last_outcome(), Some(SessionState::Failed));

    let entries = h.log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, LogStatus::Failed);
    assert_eq!(entries[0].row_count, 0);
}

#[test]
fn finished_session_is_reusable_without_reset() {
    let store = Arc::new(MemoryTableStore::new());
    let mut h = harness(store.clone());
    ready_to_preview(&mut h.session);
    h.session.set_manual_value("report_date", "2023-10-27").unwrap();
    h.session.preview().unwrap();
    h.session.commit().unwrap();

    assert_eq!(h.session.state(), SessionState::Idle);
    assert!(h.session.last_outcome().is_some_and(SessionState::is_terminal));
    assert_eq!(h.session.source_id(), None);
    assert!(h.session.file().is_none());
    assert!(h.session.manual_values().is_empty());
    assert!(h.session.commit().is_err());

    // A second upload runs through the same session.
    ready_to_preview(&mut h.session);
    assert_eq!(h.session.last_outcome(), None);
    h.session.set_manual_value("report_date", "2023-10-28").unwrap();
    h.session.preview().unwrap();
    h.session.commit().unwrap();

    assert_eq!(store.row_count(&portal_orders()), 4);
    assert_eq!(h.log.entries().len(), 2);
}

#[test]
fn selecting_a_new_source_clears_everything_downstream() {
    let mut h = harness(Arc::new(MemoryTableStore::new()));
    ready_to_preview(&mut h.session);
    h.session.set_manual_value("report_date", "2023-10-27").unwrap();
    h.session.preview().unwrap();

    h.session.select_source("src-2").unwrap();
    assert_eq!(h.session.state(), SessionState::SourceSelected);
    assert_eq!(h.session.source_id(), Some("src-2"));
    assert_eq!(h.session.resource_id(), None);
    assert!(h.session.file().is_none());
    assert!(h.session.manual_values().is_empty());
}

#[test]
fn selecting_a_resource_clears_file_and_manual_values() {
    let mut h = harness(Arc::new(MemoryTableStore::new()));
    ready_to_preview(&mut h.session);
    h.session.set_manual_value("report_date", "2023-10-27").unwrap();

    h.session.select_resource("res-1").unwrap();
    assert_eq!(h.session.state(), SessionState::ResourceSelected);
    assert!(h.session.file().is_none());
    assert!(h.session.manual_values().is_empty());
    assert_eq!(h.session.expected_format(), Some(FileFormat::Csv));
}

#[test]
fn cancel_before_commit_discards_the_session() {
    let store = Arc::new(MemoryTableStore::new());
    let mut h = harness(store.clone());
    ready_to_preview(&mut h.session);
    h.session.set_manual_value("report_date", "2023-10-27").unwrap();
    h.session.preview().unwrap();

    h.session.cancel().unwrap();
    assert_eq!(h.session.state(), SessionState::Idle);
    assert!(h.session.commit().is_err());
    assert_eq!(store.row_count(&portal_orders()), 0);
    assert!(h.log.entries().is_empty());
}

#[test]
fn cancel_handle_fired_before_dispatch_writes_and_logs_nothing() {
    let store = Arc::new(MemoryTableStore::new());
    let mut h = harness(store.clone());
    ready_to_preview(&mut h.session);
    h.session.set_manual_value("report_date", "2023-10-27").unwrap();
    h.session.preview().unwrap();

    h.session.cancel_handle().cancel();
    let err = h.session.commit().unwrap_err();
    assert!(matches!(err, IngestError::Commit(CommitError::Cancelled)));
    assert_eq!(h.session.state(), SessionState::Idle);
    assert_eq!(store.row_count(&portal_orders()), 0);
    assert!(h.log.entries().is_empty());
}

#[test]
fn inactive_resource_cannot_be_selected() {
    let reg = registry();
    let mut inactive = reg.resource("res-1").unwrap();
    inactive.active = false;
    reg.upsert_resource(inactive).unwrap();

    let coordinator =
        CommitCoordinator::new(Arc::new(MemoryTableStore::new()), RetryPolicy::immediate(1));
    let mut session = IngestionSession::new(
        Arc::new(reg),
        Arc::new(coordinator),
        Arc::new(MemoryLogSink::new()),
    );
    session.select_source("src-1").unwrap();
    assert!(matches!(
        session.select_resource("res-1"),
        Err(IngestError::Configuration(_))
    ));
}

#[test]
fn options_from_toml_drive_preview_and_date_format() {
    let options = IngestionOptions::from_toml_file("tests/fixtures/options.toml").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("ingestion.jsonl");
    let log: Arc<dyn LogSink> = Arc::new(JsonlLogSink::new(&log_path));

    let coordinator =
        CommitCoordinator::new(Arc::new(MemoryTableStore::new()), options.retry.clone());
    let mut session = IngestionSession::new(Arc::new(registry()), Arc::new(coordinator), log)
        .with_options(options);
    session.select_source("src-1").unwrap();
    session.select_resource("res-1").unwrap();
    session
        .attach_file(UploadedFile::new("orders.csv", "id\n1\n2\n3\n"))
        .unwrap();
    session.set_manual_value("report_date", "27.10.2023").unwrap();

    let preview = session.preview().unwrap();
    assert_eq!(preview.rows.len(), 2);
    assert_eq!(preview.total_rows, 3);

    session.commit().unwrap();
    let text = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.contains("\"SUCCESS\""));
}
