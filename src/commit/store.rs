//! Destination storage boundary.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use uuid::Uuid;

use crate::error::StoreError;
use crate::types::{TableId, TransformedRowSet};

/// Storage engine behind the commit coordinator.
///
/// Contract:
///
/// - `append_rows` is atomic: on `Ok` every row is visible, on `Transient`/`Permanent` none is.
/// - It is idempotent per `batch_id`: re-appending an applied batch is a successful no-op.
/// - The first append creates the table with all-text columns; a later batch whose column set
///   differs from the table's is rejected with [`StoreError::Permanent`].
/// - [`StoreError::Partial`] is reserved for engines that cannot keep the atomicity promise.
pub trait TableStore: Send + Sync {
    fn append_rows(
        &self,
        table: &TableId,
        batch_id: Uuid,
        rows: &TransformedRowSet,
    ) -> Result<(), StoreError>;
}

/// Map each table column to its index in `batch_columns`, or fail if the column sets differ.
pub(crate) fn reconcile_columns(
    table: &TableId,
    table_columns: &[String],
    batch_columns: &[String],
) -> Result<Vec<usize>, StoreError> {
    let same_set = table_columns.len() == batch_columns.len()
        && table_columns
            .iter()
            .collect::<HashSet<_>>()
            .eq(&batch_columns.iter().collect::<HashSet<_>>());
    if !same_set {
        return Err(StoreError::Permanent(format!(
            "column set of '{table}' is {table_columns:?}, batch has {batch_columns:?}"
        )));
    }
    Ok(table_columns
        .iter()
        .filter_map(|c| batch_columns.iter().position(|b| b == c))
        .collect())
}

#[derive(Debug, Default)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    batches: HashSet<Uuid>,
}

/// In-process store; tables live as long as the store.
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    tables: Mutex<HashMap<TableId, MemoryTable>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a table's contents.
    pub fn table(&self, table: &TableId) -> Option<TransformedRowSet> {
        let tables = self.tables.lock().expect("memory store lock poisoned");
        tables.get(table).map(|t| TransformedRowSet {
            columns: t.columns.clone(),
            rows: t.rows.clone(),
        })
    }

    /// Rows currently visible in `table` (0 if it does not exist).
    pub fn row_count(&self, table: &TableId) -> usize {
        self.table(table).map_or(0, |t| t.row_count())
    }

    /// Distinct batches applied to `table`.
    pub fn batch_count(&self, table: &TableId) -> usize {
        let tables = self.tables.lock().expect("memory store lock poisoned");
        tables.get(table).map_or(0, |t| t.batches.len())
    }
}

impl TableStore for MemoryTableStore {
    fn append_rows(
        &self,
        table: &TableId,
        batch_id: Uuid,
        rows: &TransformedRowSet,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("memory store lock poisoned");
        let entry = tables.entry(table.clone()).or_insert_with(|| MemoryTable {
            columns: rows.columns.clone(),
            ..Default::default()
        });

        if entry.batches.contains(&batch_id) {
            return Ok(());
        }
        let order = reconcile_columns(table, &entry.columns, &rows.columns)?;

        entry.rows.extend(
            rows.rows
                .iter()
                .map(|row| order.iter().map(|&i| row[i].clone()).collect::<Vec<_>>()),
        );
        entry.batches.insert(batch_id);
        Ok(())
    }
}
