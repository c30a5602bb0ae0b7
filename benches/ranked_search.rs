//! Benchmarks for ranked search over the in-memory store.
//!
//! Measures the exact brute-force scan used by `store.backend = "memory"`
//! for single-word neighbours and composite arithmetic queries at a few
//! vocabulary sizes.

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::cast_precision_loss)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tokio::runtime::Runtime;

use wordvec::models::{Metric, QueryVector, RankedQuery, WordEmbedding};
use wordvec::query::ExclusionFilter;
use wordvec::storage::{EmbeddingStore, MemoryStore};

const DIMENSIONS: usize = 50;

/// Deterministic pseudo-random vectors so runs are comparable.
fn populate(size: usize) -> MemoryStore {
    let store = MemoryStore::new(DIMENSIONS);
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    for i in 0..size {
        let vector = (0..DIMENSIONS)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                ((state >> 40) as f32 / (1u64 << 24) as f32) - 0.5
            })
            .collect();
        store
            .insert(WordEmbedding::new(format!("word{i}"), vector))
            .unwrap();
    }
    store
}

fn ranked(vector: QueryVector, metric: Metric) -> RankedQuery {
    let exclusion = ExclusionFilter::from_words(vector.input_words());
    RankedQuery {
        vector,
        metric,
        limit: 10,
        exclusion,
        include_distance: true,
    }
}

fn bench_neighbours(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("neighbours");

    for size in [1_000, 10_000, 50_000] {
        let store = populate(size);
        for metric in [Metric::Cosine, Metric::L2, Metric::Ip] {
            let query = ranked(QueryVector::word("word7"), metric);
            group.bench_with_input(
                BenchmarkId::new(metric.as_str(), size),
                &query,
                |b, query| {
                    b.iter(|| runtime.block_on(store.ranked_search(black_box(query))).unwrap());
                },
            );
        }
    }

    group.finish();
}

fn bench_arithmetic(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let store = populate(10_000);
    let query = ranked(
        QueryVector::composite(
            vec!["word1".into(), "word2".into(), "word3".into()],
            vec!["word4".into()],
        ),
        Metric::Cosine,
    );

    c.bench_function("arithmetic_10000", |b| {
        b.iter(|| runtime.block_on(store.ranked_search(black_box(&query))).unwrap());
    });
}

criterion_group!(benches, bench_neighbours, bench_arithmetic);
criterion_main!(benches);
