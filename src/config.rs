//! Run configuration loaded from TOML or JSON.
//!
//! ```toml
//! [storage]
//! root = "./data"
//!
//! [zones]
//! raw = "s3://raw-zone"
//! curated = "s3a://curated-zone"
//!
//! [partition]
//! year = 2024
//! month = 5
//!
//! [reader]
//! delimiter = ","
//! null_marker = "NULL"
//!
//! [execution]
//! parallelism = 3
//! alert_at_or_above = "critical"
//!
//! [datasets.suppliers]
//! source = "s3://other/proveedores.csv"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::{DatasetDescriptor, DatasetKind};
use crate::error::{PipelineError, PipelineResult};
use crate::execution::{ExecutionOptions, Severity};
use crate::ingestion::ReaderOptions;
use crate::storage::{Partition, StorageUri, partition_uri, source_uri};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    pub zones: ZonesConfig,
    pub partition: Partition,
    #[serde(default)]
    pub reader: ReaderConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub datasets: DatasetsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory the local object store maps URIs under.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// Base URIs of the raw and curated zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZonesConfig {
    pub raw: String,
    pub curated: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReaderConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub null_marker: Option<String>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            null_marker: None,
        }
    }
}

fn default_delimiter() -> String {
    ",".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default = "default_alert_at_or_above")]
    pub alert_at_or_above: Severity,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            alert_at_or_above: default_alert_at_or_above(),
        }
    }
}

fn default_parallelism() -> usize {
    DatasetKind::ALL.len()
}

fn default_alert_at_or_above() -> Severity {
    Severity::Critical
}

/// Per-dataset overrides of the conventional source and destination locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetsConfig {
    #[serde(default)]
    pub customers: Option<DatasetOverride>,
    #[serde(default)]
    pub suppliers: Option<DatasetOverride>,
    #[serde(default)]
    pub transactions: Option<DatasetOverride>,
}

impl DatasetsConfig {
    pub fn get(&self, kind: DatasetKind) -> Option<&DatasetOverride> {
        match kind {
            DatasetKind::Customers => self.customers.as_ref(),
            DatasetKind::Suppliers => self.suppliers.as_ref(),
            DatasetKind::Transactions => self.transactions.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetOverride {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
}

impl PipelineConfig {
    /// Load and validate a configuration file. The format follows the extension: `.toml` or
    /// `.json`.
    pub fn from_path(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!("failed to read '{}': {e}", path.display()))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::from_toml_str(&content),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&content),
            _ => Err(PipelineError::config(format!(
                "unsupported config format for '{}' (expected .toml or .json)",
                path.display()
            ))),
        }
    }

    pub fn from_toml_str(s: &str) -> PipelineResult<Self> {
        let cfg: Self = toml::from_str(s)
            .map_err(|e| PipelineError::config(format!("invalid toml config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(s: &str) -> PipelineResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| PipelineError::config(format!("invalid json config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every setting that deserialization alone cannot.
    pub fn validate(&self) -> PipelineResult<()> {
        self.partition.validate()?;
        self.raw_base()?;
        self.curated_base()?;
        self.reader_options()?;
        if self.execution.parallelism == 0 {
            return Err(PipelineError::config("execution.parallelism must be >= 1"));
        }
        self.descriptors()?;
        Ok(())
    }

    pub fn raw_base(&self) -> PipelineResult<StorageUri> {
        zone_uri("zones.raw", &self.zones.raw)
    }

    pub fn curated_base(&self) -> PipelineResult<StorageUri> {
        zone_uri("zones.curated", &self.zones.curated)
    }

    pub fn reader_options(&self) -> PipelineResult<ReaderOptions> {
        let delimiter = match self.reader.delimiter.as_bytes() {
            [b] => *b,
            _ => {
                return Err(PipelineError::config(format!(
                    "reader.delimiter must be a single byte, got {:?}",
                    self.reader.delimiter
                )));
            }
        };
        Ok(ReaderOptions {
            delimiter,
            null_marker: self.reader.null_marker.clone(),
        })
    }

    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            parallelism: self.execution.parallelism,
            alert_at_or_above: self.execution.alert_at_or_above,
        }
    }

    /// Descriptors of all datasets, in run order: customers, suppliers, transactions.
    ///
    /// Sources default to `{raw}/{dir}/year=YYYY/month=MM/{dir}.csv`, destinations to
    /// `{curated}/{dir}/year=YYYY/month=MM`; `[datasets.<kind>]` entries take precedence.
    pub fn descriptors(&self) -> PipelineResult<Vec<DatasetDescriptor>> {
        let raw = self.raw_base()?;
        let curated = self.curated_base()?;

        DatasetKind::ALL
            .iter()
            .map(|&kind| {
                let dir = kind.dir_name();
                let overrides = self.datasets.get(kind);

                let source = match overrides.and_then(|o| o.source.as_deref()) {
                    Some(s) => override_uri(kind, "source", s)?,
                    None => source_uri(&raw, dir, self.partition),
                };
                let destination = match overrides.and_then(|o| o.destination.as_deref()) {
                    Some(s) => override_uri(kind, "destination", s)?,
                    None => partition_uri(&curated, dir, self.partition),
                };
                Ok(DatasetDescriptor::new(kind, source, destination))
            })
            .collect()
    }
}

fn zone_uri(key: &str, raw: &str) -> PipelineResult<StorageUri> {
    StorageUri::parse(raw).map_err(|e| PipelineError::config(format!("{key}: {e}")))
}

fn override_uri(kind: DatasetKind, key: &str, raw: &str) -> PipelineResult<StorageUri> {
    StorageUri::parse(raw).map_err(|e| PipelineError::config(format!("datasets.{kind}.{key}: {e}")))
}
