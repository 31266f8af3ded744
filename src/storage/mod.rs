//! Object storage collaborators.
//!
//! The pipeline core only talks to storage through [`ObjectStore`]:
//!
//! - [`ObjectStore::open`] streams a single raw object (the reader stages it locally)
//! - [`ObjectStore::put_partition`] replaces a whole destination partition as one unit
//! - [`ObjectStore::list_partition`] enumerates a partition's objects (used for read-back)
//!
//! Implementations:
//! - [`LocalObjectStore`]: maps URIs onto a directory tree, publishes via directory renames
//! - [`MemoryObjectStore`]: map-backed store for tests and dry runs
//!
//! Destination partitions follow `{base}/{dataset}/year={YYYY}/month={MM}/`, see
//! [`partition_uri`].

pub mod local;
pub mod memory;

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

/// A parsed storage location: `scheme://bucket/key` or a bare filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageUri {
    scheme: Option<String>,
    path: String,
}

impl StorageUri {
    /// Parse a URI such as `s3://bucket/clientes/` or `./data/raw`.
    pub fn parse(raw: &str) -> PipelineResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PipelineError::config("storage uri is empty"));
        }

        match raw.split_once("://") {
            Some((scheme, rest)) => {
                if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(PipelineError::config(format!("invalid uri scheme in '{raw}'")));
                }
                let scheme = scheme.to_ascii_lowercase();
                let path = if scheme == "file" {
                    rest.trim_end_matches('/')
                } else {
                    rest.trim_matches('/')
                };
                if path.is_empty() {
                    return Err(PipelineError::config(format!("uri '{raw}' has no path")));
                }
                Ok(Self {
                    scheme: Some(scheme),
                    path: path.to_string(),
                })
            }
            None => {
                let trimmed = raw.trim_end_matches('/');
                let path = if trimmed.is_empty() { "/" } else { trimmed };
                Ok(Self {
                    scheme: None,
                    path: path.to_string(),
                })
            }
        }
    }

    /// URI scheme (`s3`, `s3a`, `file`, ...), if any.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Path part: `bucket/key` for remote schemes, a filesystem path otherwise.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Append one or more `/`-separated segments.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            return self.clone();
        }
        let path = if self.path.ends_with('/') {
            format!("{}{segment}", self.path)
        } else {
            format!("{}/{segment}", self.path)
        };
        Self {
            scheme: self.scheme.clone(),
            path,
        }
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scheme {
            Some(scheme) => write!(f, "{scheme}://{}", self.path),
            None => f.write_str(&self.path),
        }
    }
}

impl FromStr for StorageUri {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Logical date partition of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub year: u16,
    pub month: u8,
}

impl Partition {
    /// Create a partition, validating the month.
    pub fn new(year: u16, month: u8) -> PipelineResult<Self> {
        let p = Self { year, month };
        p.validate()?;
        Ok(p)
    }

    pub(crate) fn validate(&self) -> PipelineResult<()> {
        if !(1..=12).contains(&self.month) {
            return Err(PipelineError::config(format!(
                "partition month must be within 1..=12, got {}",
                self.month
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "year={:04}/month={:02}", self.year, self.month)
    }
}

/// `{base}/{dataset}/year={YYYY}/month={MM}`.
pub fn partition_uri(base: &StorageUri, dataset: &str, partition: Partition) -> StorageUri {
    base.join(dataset).join(&partition.to_string())
}

/// `{base}/{dataset}/year={YYYY}/month={MM}/{dataset}.csv`, the raw-zone layout.
pub fn source_uri(base: &StorageUri, dataset: &str, partition: Partition) -> StorageUri {
    partition_uri(base, dataset, partition).join(&format!("{dataset}.csv"))
}

/// One object to be published inside a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFile {
    /// Object name relative to the partition (no separators).
    pub name: String,
    /// Object content.
    pub bytes: Vec<u8>,
}

impl PartitionFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Storage backend used by the reader and writer.
///
/// Implementations must be shareable across pipelines running on different threads.
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Open a byte stream over one object.
    fn open(&self, uri: &StorageUri) -> io::Result<Box<dyn Read + Send>>;

    /// Replace every object under `partition` with `files`.
    ///
    /// Readers must never observe a mix of old and new objects. On error the partition keeps its
    /// previous contents.
    fn put_partition(&self, partition: &StorageUri, files: &[PartitionFile]) -> io::Result<()>;

    /// Names of the objects directly inside `partition`, sorted.
    fn list_partition(&self, partition: &StorageUri) -> io::Result<Vec<String>>;

    /// Read a whole object inside a partition.
    fn read_object(&self, partition: &StorageUri, name: &str) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.open(&partition.join(name))?.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

pub(crate) fn validate_object_name(name: &str) -> io::Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid object name '{name}'"),
        ));
    }
    Ok(())
}
