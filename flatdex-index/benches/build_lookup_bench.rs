use std::hint::black_box;
use std::sync::Arc;

use arrow::array::Int32Array;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use flatdex_index::{
    BatchRowSource, Fetch, Index, IndexConfig, IndexCursor, IndexDefinition, KeyPartDefinition,
    KeyValue, SeekOp,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const NUM_ROWS: usize = 200_000;
const NUM_PROBES: usize = 10_000;
const KEY_RANGE: i32 = 50_000;

fn random_batch(num_rows: usize) -> RecordBatch {
    let mut rng = StdRng::seed_from_u64(42);
    let keys: Vec<i32> = (0..num_rows)
        .map(|_| rng.random_range(0..KEY_RANGE))
        .collect();
    let schema = Arc::new(Schema::new(vec![Field::new("k", DataType::Int32, false)]));
    RecordBatch::try_new(schema, vec![Arc::new(Int32Array::from(keys))]).unwrap()
}

fn definition() -> IndexDefinition {
    IndexDefinition::new("bench_k", 0, false, vec![KeyPartDefinition::new("k")]).unwrap()
}

fn bench_build(c: &mut Criterion) {
    let batch = random_batch(NUM_ROWS);
    let def = definition();

    c.bench_function("build_200k_int32", |b| {
        b.iter_batched(
            || BatchRowSource::new(batch.clone()),
            |mut source| {
                let index = Index::build(&def, &mut source, IndexConfig::default()).unwrap();
                black_box(index.num_distinct())
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_lookup(c: &mut Criterion) {
    let batch = random_batch(NUM_ROWS);
    let def = definition();
    let mut rng = StdRng::seed_from_u64(7);
    let probes: Vec<KeyValue> = (0..NUM_PROBES)
        .map(|_| KeyValue::Int32(rng.random_range(0..KEY_RANGE)))
        .collect();

    let mut group = c.benchmark_group("eq_lookup_10k");
    for (label, config) in [
        ("flat", IndexConfig {
            block_threshold: None,
            ..IndexConfig::default()
        }),
        ("blocked", IndexConfig {
            block_threshold: Some(1_024),
            ..IndexConfig::default()
        }),
    ] {
        let mut source = BatchRowSource::new(batch.clone());
        let mut index = Index::build(&def, &mut source, config).unwrap();
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut hits = 0usize;
                for probe in &probes {
                    index.set_probe(std::slice::from_ref(probe)).unwrap();
                    index.seek(SeekOp::Eq);
                    while let Fetch::Row(pos) = index.fetch() {
                        hits += pos as usize & 1;
                    }
                }
                black_box(hits)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_lookup);
criterion_main!(benches);
