//! Reading datasets out of storage.
//!
//! - [`csv`]: the raw-zone reader. [`read_dataset`] stages an object locally and parses it as
//!   delimited text with a header row, every value kept as text.
//! - [`parquet`]: read-back of curated partitions written by [`crate::sink`].
//! - [`staging`]: scoped local copies of remote objects.

pub mod csv;
pub mod parquet;
pub mod staging;

pub use self::csv::{ReaderOptions, read_dataset, read_delimited_from_path, read_delimited_from_reader};
pub use self::parquet::{read_parquet_from_path, read_partition};
pub use self::staging::StagedObject;
