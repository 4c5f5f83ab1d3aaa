//! Benchmark for candidate selection and drift filtering
//!
//! Measures:
//! - Drift filter cost as the candidate set grows
//! - Full in-memory cycle (select, filter, publish, mark)

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stac_publisher_orchestration::{
    drift, CandidateSet, CycleOrchestrator, MemorySink, Message, PublisherConfig,
};
use stac_publisher_storage::{Document, InMemoryDocumentSource};
use std::sync::Arc;

fn candidate_set(range: std::ops::Range<usize>) -> CandidateSet {
    range
        .map(|i| Message::new(format!("item-{i:08}"), format!("/desc/{i}.json")))
        .collect()
}

fn bench_drift_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("drift_filter");

    for size in [1_000usize, 10_000, 100_000] {
        // 10% of the old set is also young
        let old = candidate_set(0..size);
        let young = candidate_set(size - size / 10..size + size / 10);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| drift::filter(black_box(old.clone()), black_box(&young)))
        });
    }

    group.finish();
}

fn bench_full_cycle(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let mut group = c.benchmark_group("full_cycle");
    group.sample_size(20);

    for size in [1_000usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let now = Utc::now();
                let source = Arc::new(InMemoryDocumentSource::with_documents((0..size).map(|i| {
                    Document::new(
                        format!("doc-{i:08}"),
                        now - Duration::minutes(10 + (i % 5) as i64),
                        serde_json::json!({
                            "item_id": format!("item-{i:08}"),
                            "description_path": format!("/desc/{i}.json"),
                        }),
                    )
                })));
                let orch = CycleOrchestrator::new(
                    PublisherConfig::new("item_id", std::time::Duration::from_secs(300), "bench"),
                    source,
                    Arc::new(MemorySink::new()),
                )
                .unwrap();
                runtime.block_on(orch.run_cycle_at(now)).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_drift_filter, bench_full_cycle);
criterion_main!(benches);
