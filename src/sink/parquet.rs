//! Parquet encoding of curated datasets.

use std::sync::Arc;

use parquet::basic::{ConvertedType, Repetition, Type as PhysicalType};
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::{Type, TypePtr};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, DataType, Schema, Value};

/// Encode `dataset` as a single Parquet file.
///
/// Every column is an `OPTIONAL` leaf: `Utf8` → `BYTE_ARRAY (UTF8)`, `Int64` → `INT64`. All rows go into one row group; a zero-row dataset
/// produces a file with the schema and no row groups. Identical input yields identical bytes.
pub fn encode_parquet(dataset: &DataSet) -> PipelineResult<Vec<u8>> {
    let schema = parquet_schema(&dataset.schema)?;
    let props = Arc::new(WriterProperties::builder().build());
    let mut writer = SerializedFileWriter::new(Vec::new(), schema, props)?;

    if dataset.row_count() > 0 {
        let mut rg = writer.next_row_group()?;
        let mut col_idx: usize = 0;
        while let Some(mut col) = rg.next_column()? {
            let field = dataset.schema.fields.get(col_idx).ok_or_else(|| {
                PipelineError::SchemaMismatch {
                    message: format!("parquet writer requested unknown column #{col_idx}"),
                }
            })?;
            let values = dataset.rows.iter().map(|row| &row[col_idx]);
            write_column(col.untyped(), &field.name, field.data_type, values)?;
            col.close()?;
            col_idx += 1;
        }
        rg.close()?;
    }

    let bytes = writer.into_inner()?;
    Ok(bytes)
}

fn parquet_schema(schema: &Schema) -> PipelineResult<TypePtr> {
    let mut fields: Vec<TypePtr> = Vec::with_capacity(schema.len());
    for f in &schema.fields {
        let builder = match f.data_type {
            DataType::Utf8 => Type::primitive_type_builder(&f.name, PhysicalType::BYTE_ARRAY)
                .with_converted_type(ConvertedType::UTF8),
            DataType::Int64 => Type::primitive_type_builder(&f.name, PhysicalType::INT64),
        };
        fields.push(Arc::new(builder.with_repetition(Repetition::OPTIONAL).build()?));
    }

    let root = Type::group_type_builder("schema").with_fields(fields).build()?;
    Ok(Arc::new(root))
}

fn write_column<'a>(
    writer: &mut ColumnWriter<'_>,
    column: &str,
    data_type: DataType,
    values: impl Iterator<Item = &'a Value>,
) -> PipelineResult<()> {
    let mut def_levels: Vec<i16> = Vec::new();

    // Collects the non-null values and one definition level per row.
    macro_rules! collect_present {
        ($pattern:pat => $out:expr) => {{
            let mut present = Vec::new();
            for (row, v) in values.enumerate() {
                match v {
                    Value::Null => def_levels.push(0),
                    $pattern => {
                        def_levels.push(1);
                        present.push($out);
                    }
                    other => return Err(type_mismatch(row + 1, column, data_type, other)),
                }
            }
            present
        }};
    }

    match (writer, data_type) {
        (ColumnWriter::ByteArrayColumnWriter(w), DataType::Utf8) => {
            let present = collect_present!(Value::Utf8(s) => ByteArray::from(s.as_str()));
            w.write_batch(&present, Some(def_levels.as_slice()), None)?;
        }
        (ColumnWriter::Int64ColumnWriter(w), DataType::Int64) => {
            let present = collect_present!(Value::Int64(v) => *v);
            w.write_batch(&present, Some(def_levels.as_slice()), None)?;
        }
        _ => {
            return Err(PipelineError::SchemaMismatch {
                message: format!("no parquet column writer for '{column}' of type {data_type}"),
            });
        }
    }
    Ok(())
}

fn type_mismatch(row: usize, column: &str, data_type: DataType, v: &Value) -> PipelineError {
    PipelineError::SchemaMismatch {
        message: format!("row {row} column '{column}' holds {v:?}, expected {data_type}"),
    }
}
