use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use zone_curation::catalog::DatasetKind;
use zone_curation::processing::{clean, normalize};
use zone_curation::sink::encode_parquet;
use zone_curation::types::{DataSet, Schema, Value};

/// Synthetic raw transactions; every tenth row is a duplicate of its predecessor and every
/// seventeenth has a missing price.
fn raw_transactions(n: usize) -> DataSet {
    let schema = Schema::utf8([
        "transaccion_id",
        "tipo_transaccion",
        "id_cliente_proveedor",
        "cantidad_comprada",
        "precio",
        "tipo_energia",
    ]);
    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        let id = if i % 10 == 9 { i - 1 } else { i };
        let precio = if i % 17 == 0 {
            Value::Null
        } else {
            Value::text((1_000 + id % 5_000).to_string())
        };
        rows.push(vec![
            Value::text(format!("t{id}")),
            Value::text(if id % 2 == 0 { "compra" } else { "venta" }),
            Value::text(format!("p{}", id % 50)),
            Value::text((id % 100).to_string()),
            precio,
            Value::text(if id % 3 == 0 { "solar" } else { "eolica" }),
        ]);
    }
    DataSet::new(schema, rows)
}

fn bench_clean_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("clean_normalize");
    let target = DatasetKind::Transactions.target_schema();

    for n in [1_000usize, 10_000, 100_000] {
        let raw = raw_transactions(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &raw, |b, raw| {
            b.iter(|| {
                let cleaned = clean(black_box(raw));
                normalize(&cleaned, &target).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_parquet");
    let target = DatasetKind::Transactions.target_schema();

    for n in [1_000usize, 100_000] {
        let curated = normalize(&clean(&raw_transactions(n)), &target).unwrap();
        group.throughput(Throughput::Elements(curated.row_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &curated, |b, ds| {
            b.iter(|| encode_parquet(black_box(ds)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_clean_normalize, bench_encode);
criterion_main!(benches);
