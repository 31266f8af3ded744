use std::path::Path;
use std::sync::Arc;

use zone_curation::PipelineError;
use zone_curation::catalog::DatasetKind;
use zone_curation::config::PipelineConfig;
use zone_curation::execution::{PipelineRunner, PipelineState, RunReport};
use zone_curation::ingestion::read_partition;
use zone_curation::sink::DATA_FILE_NAME;
use zone_curation::storage::{LocalObjectStore, ObjectStore, StorageUri};
use zone_curation::types::{DataType, Field, Schema, Value};

const PARTITION: &str = "year=2024/month=05";

fn config(root: &Path, parallelism: usize) -> PipelineConfig {
    PipelineConfig::from_toml_str(&format!(
        r#"
        [storage]
        root = {root:?}

        [zones]
        raw = "s3://raw-zone"
        curated = "s3a://curated-zone"

        [partition]
        year = 2024
        month = 5

        [execution]
        parallelism = {parallelism}
        "#,
        root = root.display().to_string(),
    ))
    .unwrap()
}

fn seed(root: &Path, dir: &str, fixture: &str) {
    let target = root
        .join("raw-zone")
        .join(dir)
        .join(PARTITION)
        .join(format!("{dir}.csv"));
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
    std::fs::copy(fixture, target).unwrap();
}

fn seed_all(root: &Path) {
    for kind in DatasetKind::ALL {
        let dir = kind.dir_name();
        seed(root, dir, &format!("tests/fixtures/{dir}.csv"));
    }
}

fn run(root: &Path, parallelism: usize) -> RunReport {
    let cfg = config(root, parallelism);
    let runner = PipelineRunner::new(
        Arc::new(LocalObjectStore::new(root)),
        cfg.reader_options().unwrap(),
        cfg.execution_options(),
    );
    runner.run(&cfg.descriptors().unwrap()).unwrap()
}

fn curated(dir: &str) -> StorageUri {
    StorageUri::parse(&format!("s3a://curated-zone/{dir}/{PARTITION}")).unwrap()
}

fn customers_schema() -> Schema {
    Schema::utf8(["cliente_id", "tipo_identificacion", "nombre_cliente", "ciudad"])
}

fn transactions_schema() -> Schema {
    Schema::new(vec![
        Field::new("transaccion_id", DataType::Utf8),
        Field::new("tipo_transaccion", DataType::Utf8),
        Field::new("id_cliente_proveedor", DataType::Utf8),
        Field::new("cantidad_comprada", DataType::Int64),
        Field::new("precio", DataType::Int64),
        Field::new("tipo_energia", DataType::Utf8),
    ])
}

#[test]
fn curates_all_three_datasets() {
    let dir = tempfile::tempdir().unwrap();
    seed_all(dir.path());

    let report = run(dir.path(), 3);
    assert!(report.is_success(), "{:?}", report.summary());

    let store = LocalObjectStore::new(dir.path());

    let customers = read_partition(&store, &curated("clientes"), &customers_schema()).unwrap();
    assert_eq!(customers.row_count(), 3);
    assert_eq!(
        customers.column("nombre_cliente").unwrap(),
        vec![
            &Value::text("juan perez"),
            &Value::text("ángela díaz"),
            &Value::text("marta ruiz"),
        ]
    );

    let suppliers = read_partition(
        &store,
        &curated("proveedores"),
        &Schema::utf8(["proveedor_id", "nombre", "tipo_energia"]),
    )
    .unwrap();
    assert_eq!(suppliers.row_count(), 2);
    assert_eq!(suppliers.rows[1][1], Value::text("Viento Norte"));

    let tx = read_partition(&store, &curated("transacciones"), &transactions_schema()).unwrap();
    assert_eq!(tx.row_count(), 3);
    assert_eq!(
        tx.column("cantidad_comprada").unwrap(),
        vec![&Value::Int64(10), &Value::Int64(25), &Value::Int64(7)]
    );
    assert_eq!(tx.rows[0][4], Value::Int64(2500));

    let stats = report.outcome(DatasetKind::Customers).unwrap().stats.unwrap();
    assert_eq!(stats.rows_read, 5);
    assert_eq!(stats.clean.dropped_missing, 1);
    assert_eq!(stats.clean.dropped_duplicates, 1);
    assert_eq!(stats.rows_written, 3);
}

#[test]
fn missing_suppliers_does_not_block_the_others() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), "clientes", "tests/fixtures/clientes.csv");
    seed(dir.path(), "transacciones", "tests/fixtures/transacciones.csv");

    let report = run(dir.path(), 3);

    assert!(!report.is_success());
    let suppliers = report.outcome(DatasetKind::Suppliers).unwrap();
    assert_eq!(suppliers.final_state, PipelineState::Failed);
    assert_eq!(suppliers.failed_during, Some(PipelineState::Reading));
    assert!(matches!(
        suppliers.error,
        Some(PipelineError::SourceUnavailable { .. })
    ));

    let store = LocalObjectStore::new(dir.path());
    for (kind, dir_name) in [
        (DatasetKind::Customers, "clientes"),
        (DatasetKind::Transactions, "transacciones"),
    ] {
        assert_eq!(
            report.outcome(kind).unwrap().final_state,
            PipelineState::Done
        );
        assert!(store.read_object(&curated(dir_name), DATA_FILE_NAME).is_ok());
    }
    assert!(store.list_partition(&curated("proveedores")).is_err());
}

#[test]
fn unparseable_quantity_aborts_only_transactions_and_keeps_old_partition() {
    let dir = tempfile::tempdir().unwrap();
    seed_all(dir.path());
    assert!(run(dir.path(), 1).is_success());

    let store = LocalObjectStore::new(dir.path());
    let previous = store
        .read_object(&curated("transacciones"), DATA_FILE_NAME)
        .unwrap();

    let bad = dir.path().join("bad.csv");
    std::fs::write(
        &bad,
        "transaccion_id,tipo_transaccion,id_cliente_proveedor,cantidad_comprada,precio,tipo_energia\n\
         t1,compra,p1,10,2500,solar\n\
         t2,venta,1,ten,1800,eolica\n",
    )
    .unwrap();
    seed(dir.path(), "transacciones", bad.to_str().unwrap());

    let report = run(dir.path(), 3);

    let tx = report.outcome(DatasetKind::Transactions).unwrap();
    assert_eq!(tx.failed_during, Some(PipelineState::Normalizing));
    match &tx.error {
        Some(PipelineError::CoercionError {
            row, column, raw, ..
        }) => {
            assert_eq!(*row, 2);
            assert_eq!(column, "cantidad_comprada");
            assert_eq!(raw, "ten");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(report.outcome(DatasetKind::Customers).unwrap().is_done());
    assert!(report.outcome(DatasetKind::Suppliers).unwrap().is_done());
    assert_eq!(
        store
            .read_object(&curated("transacciones"), DATA_FILE_NAME)
            .unwrap(),
        previous
    );
}

#[test]
fn reruns_produce_identical_partitions() {
    let dir = tempfile::tempdir().unwrap();
    seed_all(dir.path());
    let store = LocalObjectStore::new(dir.path());

    let snapshot = || -> Vec<Vec<u8>> {
        DatasetKind::ALL
            .iter()
            .map(|k| {
                store
                    .read_object(&curated(k.dir_name()), DATA_FILE_NAME)
                    .unwrap()
            })
            .collect()
    };

    assert!(run(dir.path(), 3).is_success());
    let first = snapshot();
    assert!(run(dir.path(), 1).is_success());
    let second = snapshot();

    assert_eq!(first, second);
}
