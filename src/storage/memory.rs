//! In-memory object store.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};
use std::sync::{Mutex, MutexGuard};

use super::{ObjectStore, PartitionFile, StorageUri, validate_object_name};

/// Map-backed object store keyed by the URI's string form.
///
/// Partition replacement happens under a single lock acquisition, so readers see either the old
/// file set or the new one.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or overwrite) a single object.
    pub fn insert(&self, uri: &StorageUri, bytes: impl Into<Vec<u8>>) {
        self.lock().insert(uri.to_string(), bytes.into());
    }

    /// Copy of a single object, if present.
    pub fn get(&self, uri: &StorageUri) -> Option<Vec<u8>> {
        self.lock().get(&uri.to_string()).cloned()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn prefix_of(partition: &StorageUri) -> String {
    format!("{partition}/")
}

impl ObjectStore for MemoryObjectStore {
    fn open(&self, uri: &StorageUri) -> io::Result<Box<dyn Read + Send>> {
        match self.get(uri) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("object not found: {uri}"),
            )),
        }
    }

    fn put_partition(&self, partition: &StorageUri, files: &[PartitionFile]) -> io::Result<()> {
        for file in files {
            validate_object_name(&file.name)?;
        }

        let prefix = prefix_of(partition);
        let mut objects = self.lock();
        objects.retain(|key, _| !key.starts_with(&prefix));
        for file in files {
            objects.insert(format!("{prefix}{}", file.name), file.bytes.clone());
        }
        Ok(())
    }

    fn list_partition(&self, partition: &StorageUri) -> io::Result<Vec<String>> {
        let prefix = prefix_of(partition);
        let objects = self.lock();
        let names: Vec<String> = objects
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("partition not found: {partition}"),
            ));
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryObjectStore;
    use crate::storage::{ObjectStore, PartitionFile, StorageUri};

    #[test]
    fn put_partition_drops_stale_objects_only_inside_partition() {
        let store = MemoryObjectStore::new();
        let part = StorageUri::parse("s3://curated/clientes/year=2024/month=05").unwrap();
        let sibling = StorageUri::parse("s3://curated/clientes/year=2024/month=06").unwrap();

        store.insert(&part.join("stale.parquet"), b"x".to_vec());
        store.insert(&sibling.join("keep.parquet"), b"y".to_vec());

        store
            .put_partition(&part, &[PartitionFile::new("part-00000.parquet", b"z".to_vec())])
            .unwrap();

        assert_eq!(store.list_partition(&part).unwrap(), vec!["part-00000.parquet"]);
        assert_eq!(store.list_partition(&sibling).unwrap(), vec!["keep.parquet"]);
    }

    #[test]
    fn invalid_file_name_leaves_partition_untouched() {
        let store = MemoryObjectStore::new();
        let part = StorageUri::parse("mem://p").unwrap();
        store
            .put_partition(&part, &[PartitionFile::new("a", b"1".to_vec())])
            .unwrap();

        assert!(store
            .put_partition(&part, &[PartitionFile::new("b/c", b"2".to_vec())])
            .is_err());
        assert_eq!(store.read_object(&part, "a").unwrap(), b"1");
    }

    #[test]
    fn open_reports_not_found() {
        let store = MemoryObjectStore::new();
        let err = store
            .open(&StorageUri::parse("s3://raw/x.csv").unwrap())
            .err()
            .unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
