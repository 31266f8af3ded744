//! `zone-curation` moves raw delimited-text datasets (customers, suppliers, transactions) from a
//! raw storage zone into a curated zone as Parquet, one date partition at a time.
//!
//! Every dataset goes through the same chain:
//!
//! 1. **Read** ([`ingestion::read_dataset`]): stage the object into a scoped temporary file and
//!    parse it as delimited text with a header row. All columns are text; empty fields are
//!    missing.
//! 2. **Clean** ([`processing::clean()`]): drop rows with any missing value, then drop exact
//!    duplicate rows (first occurrence wins).
//! 3. **Normalize** ([`processing::normalize()`]): project onto the dataset's
//!    [`catalog::TargetSchema`], renaming columns and applying [`catalog::CoercionRule`]s.
//! 4. **Write** ([`sink::write_dataset`]): encode Parquet in memory and replace the destination
//!    partition as a unit.
//!
//! [`execution::PipelineRunner`] runs one [`execution::DatasetPipeline`] per dataset, in parallel
//! on a rayon pool or sequentially. Pipelines are independent: one failing never stops or rolls
//! back the others.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use zone_curation::catalog::{DatasetDescriptor, DatasetKind};
//! use zone_curation::execution::{ExecutionOptions, PipelineRunner};
//! use zone_curation::ingestion::ReaderOptions;
//! use zone_curation::storage::{MemoryObjectStore, ObjectStore, StorageUri};
//!
//! # fn main() -> Result<(), zone_curation::PipelineError> {
//! let store = Arc::new(MemoryObjectStore::new());
//! let source = StorageUri::parse("s3://raw/clientes/year=2024/month=05/clientes.csv")?;
//! let destination = StorageUri::parse("s3://curated/clientes/year=2024/month=05")?;
//! store.insert(
//!     &source,
//!     "cliente_id,tipo_identificacion,nombre,ciudad\n1,CC,Juan PEREZ,Cali\n",
//! );
//!
//! let runner = PipelineRunner::new(
//!     store.clone(),
//!     ReaderOptions::default(),
//!     ExecutionOptions::default(),
//! );
//! let report = runner.run(&[DatasetDescriptor::new(DatasetKind::Customers, source, destination.clone())])?;
//!
//! assert!(report.is_success());
//! assert_eq!(
//!     store.list_partition(&destination)?,
//!     vec!["_SUCCESS".to_string(), "part-00000.parquet".to_string()]
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`catalog`]: dataset kinds and their target schemas
//! - [`config`]: run configuration (TOML/JSON)
//! - [`storage`]: object store abstraction, URIs and partition layout
//! - [`ingestion`]: delimited-text reader and Parquet read-back
//! - [`processing`]: cleaning and schema normalization
//! - [`sink`]: Parquet encoding and partition publishing
//! - [`execution`]: pipeline state machine, runner, metrics and observers
//! - [`types`]: schema + in-memory dataset types
//! - [`error`]: the shared error type

pub mod catalog;
pub mod config;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod processing;
pub mod sink;
pub mod storage;
pub mod types;

pub use error::{PipelineError, PipelineResult};
