//! On-disk reference store: one directory per table, one Parquet part file per batch.
//!
//! Layout: `{root}/{schema}/{table}/part-{seq}-{batch_id}.parquet`, where `seq` is the number of
//! parts already present. Every column is a required UTF8 `BYTE_ARRAY`. A batch is written to a
//! hidden temp file and renamed into place, so readers see either the whole batch or nothing.

use std::error::Error as StdError;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parquet::basic::{ConvertedType, Repetition, Type as PhysicalType};
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::FileReader;
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::{Type, TypePtr};
use uuid::Uuid;

use crate::error::StoreError;
use crate::ingestion::parquet::parse_parquet;
use crate::types::{TableId, TransformedRowSet};

use super::store::{reconcile_columns, TableStore};

/// Parquet-directory implementation of [`TableStore`].
///
/// Appends to one table must be serialized by the caller; [`super::CommitCoordinator`] does so.
#[derive(Debug, Clone)]
pub struct ParquetTableStore {
    root: PathBuf,
}

impl ParquetTableStore {
    /// Store tables under `root` (created on first write).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the part files of `table`.
    pub fn table_dir(&self, table: &TableId) -> PathBuf {
        self.root.join(&table.schema).join(&table.table)
    }

    /// Read every committed batch of `table`, oldest first.
    ///
    /// Returns `Ok(None)` if the table has never been written.
    pub fn read_table(&self, table: &TableId) -> Result<Option<TransformedRowSet>, StoreError> {
        let parts = self.part_files(table)?;
        if parts.is_empty() {
            return Ok(None);
        }

        let mut out = TransformedRowSet::default();
        for part in parts {
            let bytes = fs::read(&part).map_err(io_err)?;
            let parsed = parse_parquet(&bytes).map_err(|e| StoreError::Permanent(e.to_string()))?;
            if out.columns.is_empty() {
                out.columns = parsed.headers.clone();
            }
            let order = reconcile_columns(table, &out.columns, &parsed.headers)?;
            out.rows.extend(
                parsed
                    .rows
                    .into_iter()
                    .map(|row| order.iter().map(|&i| row[i].clone()).collect::<Vec<_>>()),
            );
        }
        Ok(Some(out))
    }

    /// Part files of `table`, in commit order.
    fn part_files(&self, table: &TableId) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.table_dir(table);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut parts: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("part-") && n.ends_with(".parquet"))
            })
            .collect();
        parts.sort();
        Ok(parts)
    }

    fn existing_columns(&self, parts: &[PathBuf]) -> Result<Option<Vec<String>>, StoreError> {
        let Some(first) = parts.first() else {
            return Ok(None);
        };
        let reader = SerializedFileReader::try_from(first.as_path()).map_err(parquet_err)?;
        let columns = reader
            .metadata()
            .file_metadata()
            .schema_descr()
            .root_schema()
            .get_fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        Ok(Some(columns))
    }
}

impl TableStore for ParquetTableStore {
    fn append_rows(
        &self,
        table: &TableId,
        batch_id: Uuid,
        rows: &TransformedRowSet,
    ) -> Result<(), StoreError> {
        if rows.columns.is_empty() {
            return Err(StoreError::Permanent(format!("batch for '{table}' has no columns")));
        }

        let parts = self.part_files(table)?;
        let suffix = format!("-{batch_id}.parquet");
        if parts.iter().any(|p| p.to_string_lossy().ends_with(&suffix)) {
            tracing::debug!(%table, %batch_id, "batch already applied");
            return Ok(());
        }

        let columns = match self.existing_columns(&parts)? {
            Some(existing) => existing,
            None => rows.columns.clone(),
        };
        let order = reconcile_columns(table, &columns, &rows.columns)?;

        let dir = self.table_dir(table);
        fs::create_dir_all(&dir).map_err(io_err)?;
        let final_path = dir.join(format!("part-{:08}{suffix}", parts.len()));
        let tmp_path = dir.join(format!(".tmp-{batch_id}.parquet"));

        let written = write_part(&tmp_path, &columns, &order, rows)
            .map_err(parquet_err)
            .and_then(|()| fs::rename(&tmp_path, &final_path).map_err(io_err));
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        written
    }
}

fn write_part(
    path: &Path,
    columns: &[String],
    order: &[usize],
    rows: &TransformedRowSet,
) -> Result<(), ParquetError> {
    let fields = columns
        .iter()
        .map(|name| {
            Type::primitive_type_builder(name, PhysicalType::BYTE_ARRAY)
                .with_repetition(Repetition::REQUIRED)
                .with_converted_type(ConvertedType::UTF8)
                .build()
                .map(Arc::new)
        })
        .collect::<Result<Vec<TypePtr>, _>>()?;
    let schema = Arc::new(Type::group_type_builder("schema").with_fields(fields).build()?);
    let props = Arc::new(WriterProperties::builder().build());

    let file = File::create(path)?;
    let mut writer = SerializedFileWriter::new(file, schema, props)?;
    let mut rg = writer.next_row_group()?;
    let mut col_idx: usize = 0;
    while let Some(mut col) = rg.next_column()? {
        let src = order[col_idx];
        let values: Vec<ByteArray> = rows
            .rows
            .iter()
            .map(|row| ByteArray::from(row[src].as_str()))
            .collect();
        match col.untyped() {
            ColumnWriter::ByteArrayColumnWriter(w) => {
                w.write_batch(&values, None, None)?;
            }
            _ => {
                return Err(ParquetError::General(format!(
                    "unexpected column writer for '{}'",
                    columns[col_idx]
                )));
            }
        }
        col.close()?;
        col_idx += 1;
    }
    rg.close()?;
    writer.close()?;
    Ok(())
}

fn io_err(e: std::io::Error) -> StoreError {
    StoreError::Transient(e.to_string())
}

/// Parquet errors caused by I/O are transient; everything else is a rejection.
fn parquet_err(e: ParquetError) -> StoreError {
    if error_chain_contains_io(&e) {
        StoreError::Transient(e.to_string())
    } else {
        StoreError::Permanent(e.to_string())
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}
