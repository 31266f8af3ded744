use thiserror::Error;

use crate::execution::PipelineState;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type returned by every pipeline stage.
///
/// A single error enum shared by reading, cleaning, normalization and writing. Each variant is
/// fatal to the dataset pipeline that raised it and to nothing else.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The object store could not open or stream a source object.
    #[error("source unavailable: {uri}: {source}")]
    SourceUnavailable {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    /// A data record does not have the same number of fields as the header.
    #[error("malformed row at line {row}: expected {expected} fields, found {found}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A value could not be coerced into the type required by the target schema.
    #[error("failed to coerce value at row {row} column '{column}': {message} (raw='{raw}')")]
    CoercionError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// Encoding or publishing the destination partition failed. The partition keeps whatever it
    /// held before the write.
    #[error("failed to write destination {destination}: {message}")]
    DestinationWriteFailure { destination: String, message: String },

    /// The input does not conform to the target schema (e.g. a mapped source column is absent).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// The run was cancelled before the pipeline entered `stage`.
    #[error("cancelled before {stage}")]
    Cancelled { stage: PipelineState },

    /// Invalid run configuration.
    #[error("config error: {message}")]
    Config { message: String },

    /// CSV parsing error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet encoding/decoding error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Underlying I/O error (e.g. staging a source into a temporary file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker pool for parallel pipelines could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl PipelineError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
