//! Benchmarks for collection reconcile and subscriber broadcast.
//!
//! Run with: `cargo bench --package docstore-runtime --bench reconcile_bench`
//!
//! # Scenarios
//!
//! | Benchmark                  | Shape                                         |
//! |----------------------------|-----------------------------------------------|
//! | reconcile/unchanged/N      | Same N ids every call; pure reuse path        |
//! | reconcile/churn_10pct/N    | 10% of ids replaced per call                  |
//! | reconcile/rebuild/N        | Disjoint id sets alternate; every state fresh |
//! | broadcast/subscribers/K    | One reconcile fanned out to K subscribers     |
//! | document_set/subscribers/K | `DocumentStore::set` fanned out to K handlers |
//!
//! Results are written to `target/criterion/reconcile_bench/`.

use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use docstore_core::testing::TestDocument;
use docstore_core::{Identified, UpdateOptions};
use docstore_runtime::{ControlsStore, DocumentStore};

#[derive(Debug, Clone)]
struct Component(String);

impl Identified for Component {
    fn id(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Test Data Generation
// ============================================================================

fn components(prefix: &str, range: std::ops::Range<usize>) -> Vec<Component> {
    range.map(|i| Component(format!("{prefix}{i}"))).collect()
}

/// `n` ids where the last tenth is renamed on odd rounds.
fn churned(n: usize, round: usize) -> Vec<Component> {
    let stable = n - n / 10;
    let mut items = components("c", 0..stable);
    let tag = if round % 2 == 0 { "even" } else { "odd" };
    items.extend(components(tag, stable..n));
    items
}

// ============================================================================
// Reconcile
// ============================================================================

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for size in [10, 100, 1_000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("unchanged", size), &size, |b, &size| {
            let store: ControlsStore<Component> = ControlsStore::default();
            let items = components("c", 0..size);
            b.iter(|| store.reconcile(black_box(items.clone())));
        });

        group.bench_with_input(BenchmarkId::new("churn_10pct", size), &size, |b, &size| {
            let store: ControlsStore<Component> = ControlsStore::default();
            let rounds = [churned(size, 0), churned(size, 1)];
            let mut round = 0usize;
            b.iter(|| {
                round += 1;
                store.reconcile(black_box(rounds[round % 2].clone()));
            });
        });

        group.bench_with_input(BenchmarkId::new("rebuild", size), &size, |b, &size| {
            let store: ControlsStore<Component> = ControlsStore::default();
            let rounds = [components("a", 0..size), components("b", 0..size)];
            let mut round = 0usize;
            b.iter(|| {
                round += 1;
                store.reconcile(black_box(rounds[round % 2].clone()));
            });
        });
    }

    group.finish();
}

// ============================================================================
// Broadcast
// ============================================================================

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");

    for subscribers in [1, 16, 128] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &subscribers| {
                let store: ControlsStore<Component> = ControlsStore::default();
                let _handles: Vec<_> = (0..subscribers)
                    .map(|_| store.subscribe(|snapshot| {
                        black_box(snapshot.len());
                    }))
                    .collect();
                let items = components("c", 0..32);
                b.iter(|| store.reconcile(black_box(items.clone())));
            },
        );
    }

    group.finish();
}

fn bench_document_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("document_set");

    for subscribers in [1, 16, 128] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &subscribers| {
                let store: DocumentStore<TestDocument> = DocumentStore::default();
                let docs = [TestDocument::detached("a"), TestDocument::detached("b")];
                let _handles: Vec<_> = (0..subscribers)
                    .map(|_| store.subscribe(|doc, _| {
                        black_box(doc.is_some());
                    }))
                    .collect();
                let mut round = 0usize;
                b.iter(|| {
                    round += 1;
                    let next = Rc::clone(&docs[round % 2]);
                    let _ = store.set(Some(black_box(next)), UpdateOptions::new());
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_reconcile, bench_broadcast, bench_document_set);

criterion_main!(benches);
