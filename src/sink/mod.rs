//! Writing curated datasets to their destination partition.
//!
//! [`write_dataset`] encodes the whole dataset first ([`encode_parquet`]) and only then hands
//! the finished file set to [`ObjectStore::put_partition`], which swaps it in as a unit. A
//! failure at any point leaves the partition as it was.

pub mod parquet;

use crate::error::{PipelineError, PipelineResult};
use crate::storage::{ObjectStore, PartitionFile, StorageUri};
use crate::types::DataSet;

pub use self::parquet::encode_parquet;

/// Name of the single data file in every curated partition.
pub const DATA_FILE_NAME: &str = "part-00000.parquet";

/// Empty marker published next to the data file once a write completes.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// What a successful write published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    pub rows: usize,
    pub bytes: usize,
}

/// Replace the contents of `destination` with `dataset` as Parquet.
///
/// Any encoding or publishing failure is reported as
/// [`PipelineError::DestinationWriteFailure`].
pub fn write_dataset(
    store: &dyn ObjectStore,
    dataset: &DataSet,
    destination: &StorageUri,
) -> PipelineResult<WriteStats> {
    let failure = |message: String| PipelineError::DestinationWriteFailure {
        destination: destination.to_string(),
        message,
    };

    let bytes = encode_parquet(dataset).map_err(|e| failure(e.to_string()))?;
    let stats = WriteStats {
        rows: dataset.row_count(),
        bytes: bytes.len(),
    };

    let files = [
        PartitionFile::new(DATA_FILE_NAME, bytes),
        PartitionFile::new(SUCCESS_MARKER, Vec::new()),
    ];
    store
        .put_partition(destination, &files)
        .map_err(|e| failure(e.to_string()))?;

    Ok(stats)
}
