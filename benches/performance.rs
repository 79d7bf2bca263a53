use std::sync::Arc;

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use fintrack::{
    engine::{EngineOptions, FixedClock, InMemoryStore, RecurrenceEngine, RecurrenceStore},
    domain::{advance_date, Frequency, RecurrenceDefinition, RecurrenceDraft, TransactionKind},
    storage::JsonRecurrenceStore,
};
use tempfile::tempdir;
use uuid::Uuid;

fn build_definitions(count: usize) -> Vec<RecurrenceDefinition> {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    (0..count)
        .map(|idx| {
            let frequency = Frequency::ALL[idx % Frequency::ALL.len()];
            RecurrenceDraft::new(
                Uuid::new_v4(),
                "42.10".parse().unwrap(),
                format!("Recurring #{idx}"),
                TransactionKind::Expense,
                frequency,
                start,
            )
            .build()
            .expect("valid draft")
        })
        .collect()
}

fn bench_advance_date(c: &mut Criterion) {
    let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();

    c.bench_function("advance_monthly_120_steps", |b| {
        b.iter(|| {
            let mut cursor = start;
            for _ in 0..120 {
                cursor = advance_date(black_box(cursor), Frequency::Monthly).expect("advance");
            }
            black_box(cursor);
        })
    });
}

fn bench_processing_pass(c: &mut Criterion) {
    let definitions = build_definitions(black_box(5_000));
    let as_of = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

    for workers in [1, 4] {
        c.bench_function(&format!("memory_pass_5k_workers_{workers}"), |b| {
            b.iter_batched(
                || Arc::new(InMemoryStore::with_definitions(definitions.clone())),
                |store| {
                    let engine = RecurrenceEngine::with_options(
                        store,
                        Arc::new(FixedClock::on(as_of)),
                        EngineOptions { workers },
                    );
                    black_box(engine.process_due(as_of));
                },
                BatchSize::SmallInput,
            );
        });
    }

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("recurrences.json");
    c.bench_function("json_pass_200", |b| {
        b.iter_batched(
            || {
                let _ = std::fs::remove_file(&path);
                let store = JsonRecurrenceStore::open(&path).expect("open store");
                for definition in build_definitions(200) {
                    store.insert_definition(&definition).expect("seed");
                }
                Arc::new(store)
            },
            |store| {
                let engine = RecurrenceEngine::new(store, Arc::new(FixedClock::on(as_of)));
                black_box(engine.process_due(as_of));
            },
            BatchSize::PerIteration,
        );
    });
}

criterion_group!(benches, bench_advance_date, bench_processing_pass);
criterion_main!(benches);
