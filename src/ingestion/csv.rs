//! Delimited-text reader for raw-zone sources.

use std::io::Read;
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::storage::{ObjectStore, StorageUri};
use crate::types::{DataSet, Schema, Value};

use super::staging::StagedObject;

/// Options controlling how raw delimited text is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Field delimiter (default `,`).
    pub delimiter: u8,
    /// Explicit null marker. Fields equal to it are treated as missing, like empty fields.
    pub null_marker: Option<String>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            null_marker: None,
        }
    }
}

/// Read a raw dataset from object storage.
///
/// The object is staged into a temporary local file which is removed before this function
/// returns. See [`read_delimited_from_reader`] for the parsing rules.
pub fn read_dataset(
    store: &dyn ObjectStore,
    uri: &StorageUri,
    options: &ReaderOptions,
) -> PipelineResult<DataSet> {
    let staged = StagedObject::fetch(store, uri)?;
    read_delimited_from_path(staged.path(), options)
}

/// Read a delimited text file from a local path.
pub fn read_delimited_from_path(
    path: impl AsRef<Path>,
    options: &ReaderOptions,
) -> PipelineResult<DataSet> {
    let mut rdr = builder(options).from_path(path)?;
    read_records(&mut rdr, options)
}

/// Read delimited text from any reader.
///
/// Rules:
///
/// - The first record is the header; its fields become the columns, in file order.
/// - Every value is kept as text ([`Value::Utf8`]), verbatim. No type inference.
/// - Empty fields, and fields equal to [`ReaderOptions::null_marker`], become [`Value::Null`].
/// - A record with a different field count than the header is a
///   [`PipelineError::MalformedRow`].
pub fn read_delimited_from_reader<R: Read>(
    reader: R,
    options: &ReaderOptions,
) -> PipelineResult<DataSet> {
    let mut rdr = builder(options).from_reader(reader);
    read_records(&mut rdr, options)
}

fn builder(options: &ReaderOptions) -> csv::ReaderBuilder {
    let mut b = csv::ReaderBuilder::new();
    // Field counts are checked here so mismatches surface as `MalformedRow`.
    b.has_headers(true).flexible(true).delimiter(options.delimiter);
    b
}

fn read_records<R: Read>(
    rdr: &mut csv::Reader<R>,
    options: &ReaderOptions,
) -> PipelineResult<DataSet> {
    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(PipelineError::SchemaMismatch {
            message: "source has no header row".to_string(),
        });
    }
    let schema = Schema::utf8(headers.iter());
    let expected = headers.len();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        let record = result?;
        if record.len() != expected {
            // 1-based line number; the header is line 1.
            let row = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(row_idx0 + 2);
            return Err(PipelineError::MalformedRow {
                row,
                expected,
                found: record.len(),
            });
        }

        let row = record
            .iter()
            .map(|raw| to_value(raw, options.null_marker.as_deref()))
            .collect();
        rows.push(row);
    }

    Ok(DataSet::new(schema, rows))
}

fn to_value(raw: &str, null_marker: Option<&str>) -> Value {
    if raw.is_empty() || Some(raw) == null_marker {
        Value::Null
    } else {
        Value::Utf8(raw.to_owned())
    }
}
