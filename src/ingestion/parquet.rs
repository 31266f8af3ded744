//! Read-back of curated Parquet partitions.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use parquet::file::reader::{ChunkReader, FileReader};
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field;

use crate::error::{PipelineError, PipelineResult};
use crate::storage::{ObjectStore, StorageUri};
use crate::types::{DataSet, DataType, Schema, Value};

use super::staging::StagedObject;

/// Read every `*.parquet` object of a curated partition, in name order, into one dataset.
///
/// Marker objects such as `_SUCCESS` are ignored.
pub fn read_partition(
    store: &dyn ObjectStore,
    partition: &StorageUri,
    schema: &Schema,
) -> PipelineResult<DataSet> {
    let names = store
        .list_partition(partition)
        .map_err(|source| PipelineError::SourceUnavailable {
            uri: partition.to_string(),
            source,
        })?;

    let mut out = DataSet::empty(schema.clone());
    for name in names.iter().filter(|n| n.ends_with(".parquet")) {
        let staged = StagedObject::fetch(store, &partition.join(name))?;
        out.extend_from(read_parquet_from_path(staged.path(), schema)?);
    }
    Ok(out)
}

/// Read a Parquet file into an in-memory `DataSet`.
///
/// Notes:
/// - Validates that all schema fields exist as Parquet leaf columns (by column path string)
/// - Uses the Parquet record API (`RowIter`)
pub fn read_parquet_from_path(path: impl AsRef<Path>, schema: &Schema) -> PipelineResult<DataSet> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;

    let available_columns = parquet_leaf_column_paths(&reader);
    for field in &schema.fields {
        if !available_columns.contains(field.name.as_str()) {
            return Err(PipelineError::SchemaMismatch {
                message: format!("missing required column '{}'", field.name),
            });
        }
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx0, row_res) in reader.into_iter().enumerate() {
        let row_num = idx0 + 1;
        let row = row_res?;

        let map: HashMap<&str, &Field> = row
            .get_column_iter()
            .map(|(name, field)| (name.as_str(), field))
            .collect();

        let mut out_row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for f in &schema.fields {
            let v = map.get(f.name.as_str()).ok_or_else(|| PipelineError::SchemaMismatch {
                message: format!("row {row_num} missing required column '{}'", f.name),
            })?;
            out_row.push(convert_parquet_field(row_num, &f.name, f.data_type, v)?);
        }
        rows.push(out_row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn parquet_leaf_column_paths<R: ChunkReader + 'static>(
    reader: &SerializedFileReader<R>,
) -> HashSet<String> {
    reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.path().string())
        .collect()
}

fn convert_parquet_field(
    row: usize,
    column: &str,
    data_type: DataType,
    f: &Field,
) -> PipelineResult<Value> {
    if matches!(f, Field::Null) {
        return Ok(Value::Null);
    }

    let mismatch = |expected: &str| PipelineError::CoercionError {
        row,
        column: column.to_string(),
        raw: f.to_string(),
        message: format!("expected {expected}"),
    };

    match (data_type, f) {
        (DataType::Utf8, Field::Str(s)) => Ok(Value::Utf8(s.clone())),
        (DataType::Utf8, _) => Err(mismatch("string")),
        (DataType::Int64, Field::Long(v)) => Ok(Value::Int64(*v)),
        (DataType::Int64, _) => Err(mismatch("int64")),
    }
}
