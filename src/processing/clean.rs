//! Row cleaning: missing-value and duplicate removal.

use std::collections::HashSet;

use crate::types::{DataSet, Value};

/// Row counts observed while cleaning one dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub input_rows: usize,
    /// Rows dropped because at least one field was missing.
    pub dropped_missing: usize,
    /// Rows dropped as exact duplicates of an earlier row.
    pub dropped_duplicates: usize,
    pub output_rows: usize,
}

/// Drop rows with missing values, then drop duplicate rows.
///
/// Survivors keep their relative order and the first occurrence of each duplicate group is the
/// one kept. The input is not modified.
pub fn clean(dataset: &DataSet) -> DataSet {
    clean_with_stats(dataset).0
}

/// Like [`clean`], also reporting how many rows each pass removed.
pub fn clean_with_stats(dataset: &DataSet) -> (DataSet, CleanStats) {
    let complete = drop_missing(dataset);
    let deduped = drop_duplicates(&complete);
    let stats = CleanStats {
        input_rows: dataset.row_count(),
        dropped_missing: dataset.row_count() - complete.row_count(),
        dropped_duplicates: complete.row_count() - deduped.row_count(),
        output_rows: deduped.row_count(),
    };
    (deduped, stats)
}

/// Returns a new [`DataSet`] without the rows that contain a [`Value::Null`].
pub fn drop_missing(dataset: &DataSet) -> DataSet {
    dataset.filter_rows(|row| !row.iter().any(Value::is_missing))
}

/// Returns a new [`DataSet`] keeping only the first occurrence of each distinct row.
pub fn drop_duplicates(dataset: &DataSet) -> DataSet {
    let mut seen: HashSet<&[Value]> = HashSet::with_capacity(dataset.row_count());
    let rows = dataset
        .rows
        .iter()
        .filter(|row| seen.insert(row.as_slice()))
        .cloned()
        .collect();
    DataSet::new(dataset.schema.clone(), rows)
}
