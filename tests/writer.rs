use zone_curation::PipelineError;
use zone_curation::ingestion::read_partition;
use zone_curation::sink::{DATA_FILE_NAME, SUCCESS_MARKER, write_dataset};
use zone_curation::storage::{LocalObjectStore, ObjectStore, StorageUri};
use zone_curation::types::{DataSet, DataType, Field, Schema, Value};

fn schema() -> Schema {
    Schema::new(vec![
        Field::new("transaccion_id", DataType::Utf8),
        Field::new("precio", DataType::Int64),
    ])
}

fn rows(ids: &[(&str, i64)]) -> DataSet {
    DataSet::new(
        schema(),
        ids.iter()
            .map(|(id, p)| vec![Value::text(*id), Value::Int64(*p)])
            .collect(),
    )
}

fn destination() -> StorageUri {
    StorageUri::parse("s3a://curated-zone/transacciones/year=2024/month=05").unwrap()
}

#[test]
fn overwrite_leaves_only_new_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalObjectStore::new(dir.path());
    let dest = destination();

    write_dataset(&store, &rows(&[("old-1", 1), ("old-2", 2), ("old-3", 3)]), &dest).unwrap();
    let stats = write_dataset(&store, &rows(&[("new-1", 10)]), &dest).unwrap();
    assert_eq!(stats.rows, 1);

    let back = read_partition(&store, &dest, &schema()).unwrap();
    assert_eq!(back, rows(&[("new-1", 10)]));
    assert_eq!(
        store.list_partition(&dest).unwrap(),
        vec![SUCCESS_MARKER.to_string(), DATA_FILE_NAME.to_string()]
    );
}

#[test]
fn failed_write_keeps_previous_partition() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalObjectStore::new(dir.path());
    let dest = destination();
    write_dataset(&store, &rows(&[("t1", 2500)]), &dest).unwrap();
    let before = store.read_object(&dest, DATA_FILE_NAME).unwrap();

    // A text value in an Int64 column cannot be encoded.
    let bad = DataSet::new(schema(), vec![vec![Value::text("t2"), Value::text("2500")]]);
    let err = write_dataset(&store, &bad, &dest).unwrap_err();

    assert!(matches!(err, PipelineError::DestinationWriteFailure { .. }));
    assert_eq!(store.read_object(&dest, DATA_FILE_NAME).unwrap(), before);
    assert_eq!(
        read_partition(&store, &dest, &schema()).unwrap(),
        rows(&[("t1", 2500)])
    );
}

#[test]
fn rewriting_same_rows_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalObjectStore::new(dir.path());
    let dest = destination();
    let ds = rows(&[("t1", 2500), ("t2", 1800)]);

    write_dataset(&store, &ds, &dest).unwrap();
    let first = store.read_object(&dest, DATA_FILE_NAME).unwrap();
    write_dataset(&store, &ds, &dest).unwrap();
    let second = store.read_object(&dest, DATA_FILE_NAME).unwrap();

    assert_eq!(first, second);
}

#[test]
fn empty_dataset_publishes_schema_only_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalObjectStore::new(dir.path());
    let dest = destination();

    let stats = write_dataset(&store, &DataSet::empty(schema()), &dest).unwrap();

    assert_eq!(stats.rows, 0);
    assert_eq!(read_partition(&store, &dest, &schema()).unwrap().row_count(), 0);
}
