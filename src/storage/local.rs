//! Filesystem-backed object store.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};
use tracing::{debug, warn};

use super::{ObjectStore, PartitionFile, StorageUri, validate_object_name};

/// Object store rooted at a local directory.
///
/// `scheme://bucket/key` resolves to `root/bucket/key`, `file:///abs` and absolute bare paths
/// resolve to themselves, relative bare paths resolve under `root`.
///
/// Partitions are published by writing into a hidden sibling staging directory and renaming it
/// over the destination. The previous directory is moved aside first and restored if the final
/// rename fails.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    rename: fn(&Path, &Path) -> io::Result<()>,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`. The directory does not need to exist yet.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            rename: rename_dir,
        }
    }

    #[cfg(test)]
    fn with_rename(mut self, rename: fn(&Path, &Path) -> io::Result<()>) -> Self {
        self.rename = rename;
        self
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path a URI maps to.
    pub fn resolve(&self, uri: &StorageUri) -> PathBuf {
        match uri.scheme() {
            Some("file") => PathBuf::from(uri.path()),
            Some(_) => self.root.join(uri.path()),
            None => {
                let p = Path::new(uri.path());
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    self.root.join(p)
                }
            }
        }
    }
}

impl ObjectStore for LocalObjectStore {
    fn open(&self, uri: &StorageUri) -> io::Result<Box<dyn Read + Send>> {
        let path = self.resolve(uri);
        let file = File::open(&path)?;
        Ok(Box::new(file))
    }

    fn put_partition(&self, partition: &StorageUri, files: &[PartitionFile]) -> io::Result<()> {
        let dest = self.resolve(partition);
        let (parent, leaf) = split_dir(&dest)?;
        fs::create_dir_all(&parent)?;

        let staging = hidden_dir(&parent, &leaf, "staging")?;
        write_files(staging.path(), files)?;

        // The previous directory moves inside a hidden holder so it can be restored.
        let backup = if dest.exists() {
            let holder = hidden_dir(&parent, &leaf, "previous")?;
            (self.rename)(&dest, &holder.path().join(&leaf))?;
            Some(holder)
        } else {
            None
        };

        if let Err(e) = (self.rename)(staging.path(), &dest) {
            if let Some(holder) = backup {
                if let Err(restore) = (self.rename)(&holder.path().join(&leaf), &dest) {
                    let kept = holder.keep();
                    warn!(
                        partition = %partition,
                        backup = %kept.join(&leaf).display(),
                        error = %restore,
                        "failed to restore previous partition contents"
                    );
                }
            }
            return Err(e);
        }
        // Now lives at `dest`.
        let _ = staging.keep();

        let replaced = backup.is_some();
        if let Some(holder) = backup {
            let path = holder.path().to_path_buf();
            if let Err(e) = holder.close() {
                warn!(backup = %path.display(), error = %e, "failed to remove replaced partition");
            }
        }

        debug!(
            partition = %partition,
            path = %dest.display(),
            files = files.len(),
            replaced,
            "published partition"
        );
        Ok(())
    }

    fn list_partition(&self, partition: &StorageUri) -> io::Result<Vec<String>> {
        let dir = self.resolve(partition);
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("partition not found: {}", dir.display()),
            ));
        }

        let pattern = format!(
            "{}/*",
            glob::Pattern::escape(&dir.to_string_lossy())
        );
        let entries = glob::glob(&pattern)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(io::Error::from)?;
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn split_dir(dest: &Path) -> io::Result<(PathBuf, String)> {
    let parent = dest.parent().filter(|p| !p.as_os_str().is_empty());
    let leaf = dest.file_name().and_then(|n| n.to_str());
    match (parent, leaf) {
        (Some(parent), Some(leaf)) => Ok((parent.to_path_buf(), leaf.to_string())),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cannot publish a partition at {}", dest.display()),
        )),
    }
}

fn write_files(dir: &Path, files: &[PartitionFile]) -> io::Result<()> {
    for file in files {
        validate_object_name(&file.name)?;
        let mut f = File::create(dir.join(&file.name))?;
        f.write_all(&file.bytes)?;
        f.sync_all()?;
    }
    Ok(())
}

fn hidden_dir(parent: &Path, leaf: &str, role: &str) -> io::Result<TempDir> {
    Builder::new()
        .prefix(&format!(".{leaf}.{role}-"))
        .tempdir_in(parent)
}

fn rename_dir(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;
    use std::path::Path;

    use super::LocalObjectStore;
    use crate::storage::{ObjectStore, PartitionFile, StorageUri};

    fn uri(s: &str) -> StorageUri {
        StorageUri::parse(s).unwrap()
    }

    fn hidden_entries(store: &LocalObjectStore, part: &StorageUri) -> Vec<String> {
        let parent = store.resolve(part).parent().unwrap().to_path_buf();
        let mut names: Vec<_> = fs::read_dir(parent)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with('.'))
            .collect();
        names.sort();
        names
    }

    fn name_contains(path: &Path, needle: &str) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains(needle))
    }

    fn refuse_publish(from: &Path, to: &Path) -> io::Result<()> {
        if name_contains(from, ".staging-") {
            return Err(io::Error::other("publish rename refused"));
        }
        fs::rename(from, to)
    }

    fn refuse_publish_and_restore(from: &Path, to: &Path) -> io::Result<()> {
        let restoring = from.parent().is_some_and(|p| name_contains(p, ".previous-"));
        if name_contains(from, ".staging-") || restoring {
            return Err(io::Error::other("rename refused"));
        }
        fs::rename(from, to)
    }

    #[test]
    fn failed_publish_rename_restores_previous_partition() {
        let dir = tempfile::tempdir().unwrap();
        let part = uri("s3://curated/transacciones/year=2024/month=05");
        LocalObjectStore::new(dir.path())
            .put_partition(&part, &[PartitionFile::new("part-00000.parquet", b"v1".to_vec())])
            .unwrap();

        let store = LocalObjectStore::new(dir.path()).with_rename(refuse_publish);
        let err = store
            .put_partition(&part, &[PartitionFile::new("part-00000.parquet", b"v2".to_vec())])
            .unwrap_err();

        assert_eq!(err.to_string(), "publish rename refused");
        assert_eq!(store.list_partition(&part).unwrap(), vec!["part-00000.parquet"]);
        assert_eq!(store.read_object(&part, "part-00000.parquet").unwrap(), b"v1");
        assert!(hidden_entries(&store, &part).is_empty());
    }

    #[test]
    fn failed_restore_leaves_previous_partition_in_backup() {
        let dir = tempfile::tempdir().unwrap();
        let part = uri("s3://curated/transacciones/year=2024/month=05");
        LocalObjectStore::new(dir.path())
            .put_partition(&part, &[PartitionFile::new("part-00000.parquet", b"v1".to_vec())])
            .unwrap();

        let store = LocalObjectStore::new(dir.path()).with_rename(refuse_publish_and_restore);
        store
            .put_partition(&part, &[PartitionFile::new("part-00000.parquet", b"v2".to_vec())])
            .unwrap_err();

        assert!(!store.resolve(&part).exists());
        let hidden = hidden_entries(&store, &part);
        assert_eq!(hidden.len(), 1, "{hidden:?}");
        assert!(hidden[0].starts_with(".month=05.previous-"));

        let parent = store.resolve(&part).parent().unwrap().to_path_buf();
        let kept = parent
            .join(&hidden[0])
            .join("month=05")
            .join("part-00000.parquet");
        assert_eq!(fs::read(kept).unwrap(), b"v1");
    }

    #[test]
    fn first_publish_leaves_no_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let part = uri("s3://curated/clientes/year=2024/month=05");

        store
            .put_partition(&part, &[PartitionFile::new("_SUCCESS", Vec::new())])
            .unwrap();

        assert_eq!(store.root(), dir.path());
        assert!(store.resolve(&part).join("_SUCCESS").is_file());
        assert!(hidden_entries(&store, &part).is_empty());
    }

    #[test]
    fn resolve_maps_schemes_under_root() {
        let store = LocalObjectStore::new("/srv/lake");
        assert_eq!(
            store.resolve(&uri("s3://raw/clientes/a.csv")),
            std::path::PathBuf::from("/srv/lake/raw/clientes/a.csv")
        );
        assert_eq!(
            store.resolve(&uri("file:///tmp/x.csv")),
            std::path::PathBuf::from("/tmp/x.csv")
        );
        assert_eq!(
            store.resolve(&uri("raw/y.csv")),
            std::path::PathBuf::from("/srv/lake/raw/y.csv")
        );
    }

    #[test]
    fn put_partition_replaces_previous_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let part = uri("s3://curated/clientes/year=2024/month=05");

        store
            .put_partition(
                &part,
                &[
                    PartitionFile::new("part-00000.parquet", b"old".to_vec()),
                    PartitionFile::new("part-00001.parquet", b"old".to_vec()),
                ],
            )
            .unwrap();
        store
            .put_partition(&part, &[PartitionFile::new("part-00000.parquet", b"new".to_vec())])
            .unwrap();

        assert_eq!(store.list_partition(&part).unwrap(), vec!["part-00000.parquet"]);
        assert_eq!(store.read_object(&part, "part-00000.parquet").unwrap(), b"new");
    }

    #[test]
    fn failed_put_keeps_previous_contents_and_cleans_staging() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let part = uri("s3://curated/proveedores/year=2024/month=05");

        store
            .put_partition(&part, &[PartitionFile::new("part-00000.parquet", b"v1".to_vec())])
            .unwrap();

        let err = store
            .put_partition(
                &part,
                &[
                    PartitionFile::new("part-00000.parquet", b"v2".to_vec()),
                    PartitionFile::new("../escape", b"v2".to_vec()),
                ],
            )
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);

        assert_eq!(store.read_object(&part, "part-00000.parquet").unwrap(), b"v1");
        let leftovers = hidden_entries(&store, &part);
        assert!(leftovers.is_empty(), "staging left behind: {leftovers:?}");
    }

    #[test]
    fn list_partition_errors_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let err = store.list_partition(&uri("s3://curated/none")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn open_missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let err = store.open(&uri("s3://raw/missing.csv")).err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
