//! Local staging of remote objects.

use std::io::{self, Seek, SeekFrom};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{PipelineError, PipelineResult};
use crate::storage::{ObjectStore, StorageUri};

/// A remote object copied into a local temporary file.
///
/// The file is deleted when the value is dropped, on success and error paths alike.
#[derive(Debug)]
pub struct StagedObject {
    file: NamedTempFile,
    len: u64,
}

impl StagedObject {
    /// Stream `uri` from `store` into a fresh temporary file.
    ///
    /// Failures to open or read the object are reported as
    /// [`PipelineError::SourceUnavailable`].
    pub fn fetch(store: &dyn ObjectStore, uri: &StorageUri) -> PipelineResult<Self> {
        let unavailable = |source: io::Error| PipelineError::SourceUnavailable {
            uri: uri.to_string(),
            source,
        };

        let mut src = store.open(uri).map_err(unavailable)?;

        let suffix = Path::new(uri.path())
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let mut file = tempfile::Builder::new()
            .prefix("zone-curation-")
            .suffix(&suffix)
            .tempfile()?;

        let len = io::copy(&mut src, file.as_file_mut()).map_err(unavailable)?;
        file.as_file_mut().seek(SeekFrom::Start(0))?;

        Ok(Self { file, len })
    }

    /// Local path of the staged copy.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of bytes staged.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::StagedObject;
    use crate::error::PipelineError;
    use crate::storage::{MemoryObjectStore, StorageUri};

    #[test]
    fn staged_file_is_removed_on_drop() {
        let store = MemoryObjectStore::new();
        let uri = StorageUri::parse("s3://raw/clientes/clientes.csv").unwrap();
        store.insert(&uri, b"a,b\n1,2\n".to_vec());

        let staged = StagedObject::fetch(&store, &uri).unwrap();
        let path = staged.path().to_path_buf();
        assert_eq!(staged.len(), 8);
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("csv"));
        assert_eq!(std::fs::read(&path).unwrap(), b"a,b\n1,2\n");

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn missing_object_is_source_unavailable() {
        let store = MemoryObjectStore::new();
        let uri = StorageUri::parse("s3://raw/missing.csv").unwrap();
        let err = StagedObject::fetch(&store, &uri).unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable { ref uri, .. } if uri == "s3://raw/missing.csv"));
    }
}
