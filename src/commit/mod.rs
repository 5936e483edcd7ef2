//! Commit coordination: atomic, idempotent, retried appends of a prepared row set.
//!
//! A [`CommitCoordinator`] owns the retry loop around a [`TableStore`]. Every commit gets one
//! batch id that is reused across retries, so an attempt whose acknowledgement was lost can be
//! re-sent without duplicating rows. Commits to the same table are serialized; commits to
//! different tables run in parallel.

mod parquet_store;
mod store;

pub use parquet_store::ParquetTableStore;
pub use store::{MemoryTableStore, TableStore};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use uuid::Uuid;

use crate::config::RetryPolicy;
use crate::error::{CommitError, StoreError};
use crate::types::{TableId, TransformedRowSet};

/// Cooperative cancellation flag shared between a session and its in-flight commit.
///
/// Cancelling before the first attempt is dispatched guarantees nothing is written. Once an
/// attempt is in flight it runs to completion, but no further retry starts.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Live counters of one commit; readable from another thread while it runs.
#[derive(Debug, Default)]
pub struct CommitProgress {
    attempts: AtomicU32,
    rows_total: AtomicU64,
    rows_committed: AtomicU64,
    elapsed_ms: AtomicU64,
}

/// A point-in-time copy of [`CommitProgress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitProgressSnapshot {
    pub attempts: u32,
    pub rows_total: u64,
    pub rows_committed: u64,
    pub elapsed_ms: u64,
}

impl CommitProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&self, rows: usize) {
        self.attempts.store(0, Ordering::SeqCst);
        self.rows_total.store(rows as u64, Ordering::SeqCst);
        self.rows_committed.store(0, Ordering::SeqCst);
        self.elapsed_ms.store(0, Ordering::SeqCst);
    }

    fn attempt(&self) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self, committed: usize, started: Instant) {
        self.rows_committed.store(committed as u64, Ordering::SeqCst);
        self.elapsed_ms
            .store(started.elapsed().as_millis() as u64, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> CommitProgressSnapshot {
        CommitProgressSnapshot {
            attempts: self.attempts.load(Ordering::SeqCst),
            rows_total: self.rows_total.load(Ordering::SeqCst),
            rows_committed: self.rows_committed.load(Ordering::SeqCst),
            elapsed_ms: self.elapsed_ms.load(Ordering::SeqCst),
        }
    }
}

/// Acknowledgement of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub batch_id: Uuid,
    pub table: TableId,
    pub rows: usize,
    /// Store attempts made, including the successful one.
    pub attempts: u32,
}

/// Appends row sets to Bronze tables through a [`TableStore`], retrying transient failures.
pub struct CommitCoordinator {
    store: Arc<dyn TableStore>,
    retry: RetryPolicy,
    table_locks: Mutex<HashMap<TableId, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for CommitCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitCoordinator")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl CommitCoordinator {
    pub fn new(store: Arc<dyn TableStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            retry,
            table_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Commit `rows` to `table` with no cancellation and no progress tracking.
    pub fn commit(
        &self,
        table: &TableId,
        rows: &TransformedRowSet,
    ) -> Result<CommitReceipt, CommitError> {
        self.commit_with(table, rows, &CancelHandle::new(), &CommitProgress::new())
    }

    /// Commit `rows` to `table` as one batch.
    ///
    /// Transient store failures are retried with backoff until the policy is exhausted or
    /// `cancel` fires; permanent and partial failures are returned immediately. Commits to the
    /// same table are serialized for the whole retry loop.
    pub fn commit_with(
        &self,
        table: &TableId,
        rows: &TransformedRowSet,
        cancel: &CancelHandle,
        progress: &CommitProgress,
    ) -> Result<CommitReceipt, CommitError> {
        let started = Instant::now();
        progress.begin(rows.row_count());

        let lock = self.table_lock(table);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if cancel.is_cancelled() {
            return Err(CommitError::Cancelled);
        }

        let batch_id = Uuid::new_v4();
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let wait = self.retry.backoff_before(attempt);
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }
            progress.attempt();

            match self.store.append_rows(table, batch_id, rows) {
                Ok(()) => {
                    progress.finish(rows.row_count(), started);
                    tracing::info!(
                        %table,
                        %batch_id,
                        rows = rows.row_count(),
                        attempts = attempt,
                        "batch committed"
                    );
                    return Ok(CommitReceipt {
                        batch_id,
                        table: table.clone(),
                        rows: rows.row_count(),
                        attempts: attempt,
                    });
                }
                Err(StoreError::Transient(message)) => {
                    if attempt >= max_attempts || cancel.is_cancelled() {
                        progress.finish(0, started);
                        return Err(CommitError::Transient {
                            attempts: attempt,
                            message,
                        });
                    }
                    tracing::warn!(
                        %table,
                        %batch_id,
                        attempt,
                        max_attempts,
                        error = %message,
                        "transient store failure; retrying"
                    );
                }
                Err(StoreError::Permanent(message)) => {
                    progress.finish(0, started);
                    return Err(CommitError::Permanent(message));
                }
                Err(StoreError::Partial(message)) => {
                    progress.finish(0, started);
                    tracing::error!(
                        %table,
                        %batch_id,
                        error = %message,
                        "store reported a partial write"
                    );
                    return Err(CommitError::PartialFailure(message));
                }
            }
        }
    }

    fn table_lock(&self, table: &TableId) -> Arc<Mutex<()>> {
        let mut locks = self
            .table_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(table.clone()).or_default())
    }
}
