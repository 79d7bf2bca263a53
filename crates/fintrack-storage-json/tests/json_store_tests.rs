use std::{
    fs::{self, OpenOptions},
    sync::{mpsc, Arc, Barrier},
    thread,
    time::Duration,
};

use chrono::{NaiveDate, Utc};
use fintrack_core::{
    storage::{DueEntry, RecurrenceStore},
    FailureKind, FixedClock, RecurrenceEngine, StoreError,
};
use fintrack_domain::{
    DateWindow, Frequency, RecurrenceDefinition, RecurrenceDraft, TransactionKind, Transition,
};
use fintrack_storage_json::JsonRecurrenceStore;
use fs2::FileExt;
use serde_json::Value;
use tempfile::tempdir;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn definition(frequency: Frequency, start: NaiveDate) -> RecurrenceDefinition {
    RecurrenceDraft::new(
        Uuid::new_v4(),
        "12.50".parse().unwrap(),
        "Streaming plan",
        TransactionKind::Expense,
        frequency,
        start,
    )
    .with_category("Entertainment")
    .build()
    .unwrap()
}

#[test]
fn open_creates_empty_snapshot() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("store.json");
    let store = JsonRecurrenceStore::open(&path).expect("open store");

    assert!(path.exists());
    assert!(store.list_definitions().unwrap().is_empty());
    assert!(store.transactions().unwrap().is_empty());
}

#[test]
fn definitions_survive_reopen() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("store.json");
    let def = definition(Frequency::Monthly, date(2024, 1, 31));
    {
        let store = JsonRecurrenceStore::open(&path).unwrap();
        store.insert_definition(&def).unwrap();
    }

    let store = JsonRecurrenceStore::open(&path).unwrap();
    assert_eq!(store.definition(def.id).unwrap(), Some(def.clone()));
    assert!(matches!(
        store.insert_definition(&def),
        Err(StoreError::Duplicate { id }) if id == def.id
    ));
}

#[test]
fn commit_writes_transaction_and_cursor_together() {
    let dir = tempdir().expect("tempdir");
    let store = JsonRecurrenceStore::open(dir.path().join("store.json")).unwrap();
    let def = definition(Frequency::Weekly, date(2024, 1, 1));
    store.insert_definition(&def).unwrap();

    let txn = def.materialize(Utc::now());
    store
        .commit_occurrence(
            &txn,
            Transition::Advance {
                next: date(2024, 1, 8),
            },
        )
        .unwrap();

    let stored = store.definition(def.id).unwrap().unwrap();
    assert_eq!(stored.next_occurrence, date(2024, 1, 8));
    assert_eq!(store.transactions().unwrap(), vec![txn.clone()]);

    // Replaying the same occurrence is rejected and leaves the file untouched.
    let err = store
        .commit_occurrence(
            &txn,
            Transition::Advance {
                next: date(2024, 1, 8),
            },
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
    assert_eq!(store.transactions().unwrap().len(), 1);
    assert!(!dir.path().join("store.json.tmp").exists());
}

#[test]
fn unknown_frequency_rows_materialize_then_terminate() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("store.json");
    let store = Arc::new(JsonRecurrenceStore::open(&path).unwrap());
    let def = definition(Frequency::Daily, date(2024, 1, 1));
    store.insert_definition(&def).unwrap();

    let mut raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    raw["definitions"][0]["frequency"] = Value::String("FORTNIGHTLY".into());
    fs::write(&path, serde_json::to_string_pretty(&raw).unwrap()).unwrap();

    let due = store.list_due(date(2024, 1, 1)).unwrap();
    assert_eq!(due.len(), 1);
    assert!(matches!(
        &due[0],
        DueEntry::Unschedulable { occurrence, frequency }
            if occurrence.recurrence_id == def.id
                && occurrence.date == date(2024, 1, 1)
                && frequency == "FORTNIGHTLY"
    ));
    assert!(store.list_definitions().unwrap().is_empty());

    let engine = RecurrenceEngine::new(
        store.clone(),
        Arc::new(FixedClock::on(date(2024, 1, 1))),
    );
    let report = engine.process_due(date(2024, 1, 1));
    assert_eq!(report.materialized_count, 1);
    assert_eq!(report.terminated_count, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, FailureKind::InvalidFrequency);

    let transactions = store.transactions().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].recurrence_id, def.id);
    assert_eq!(transactions[0].date, date(2024, 1, 1));
    assert_eq!(transactions[0].amount, def.amount);

    let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["definitions"][0]["is_active"], Value::Bool(false));
    assert_eq!(raw["definitions"][0]["frequency"], "FORTNIGHTLY");
    assert!(store.list_due(date(2024, 1, 1)).unwrap().is_empty());
}

#[test]
fn concurrent_handles_commit_an_occurrence_once() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("store.json");
    let first = Arc::new(JsonRecurrenceStore::open(&path).unwrap());
    let second = Arc::new(JsonRecurrenceStore::open(&path).unwrap());

    for round in 0..16 {
        let def = definition(Frequency::Daily, date(2024, 1, 1));
        first.insert_definition(&def).unwrap();
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = [first.clone(), second.clone()]
            .into_iter()
            .map(|store| {
                let def = def.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let txn = def.materialize(Utc::now());
                    barrier.wait();
                    store.commit_occurrence(
                        &txn,
                        Transition::Advance {
                            next: date(2024, 1, 2),
                        },
                    )
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let committed = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(committed, 1, "round {round}: {results:?}");
        assert!(results
            .iter()
            .any(|result| matches!(result, Err(StoreError::Conflict { .. }))));
    }
    assert_eq!(second.transactions().unwrap().len(), 16);
}

#[test]
fn commit_waits_for_foreign_file_lock() {
    let dir = tempdir().expect("tempdir");
    let store = Arc::new(JsonRecurrenceStore::open(dir.path().join("store.json")).unwrap());
    let def = definition(Frequency::Weekly, date(2024, 3, 4));
    store.insert_definition(&def).unwrap();

    let foreign = OpenOptions::new()
        .read(true)
        .write(true)
        .open(store.lock_path())
        .expect("lock file exists");
    FileExt::lock_exclusive(&foreign).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let writer = {
        let store = store.clone();
        let txn = def.materialize(Utc::now());
        thread::spawn(move || {
            let result = store.commit_occurrence(
                &txn,
                Transition::Advance {
                    next: date(2024, 3, 11),
                },
            );
            let _ = done_tx.send(());
            result
        })
    };

    assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());
    FileExt::unlock(&foreign).unwrap();
    writer.join().unwrap().expect("commit after unlock");
    assert_eq!(
        store.definition(def.id).unwrap().unwrap().next_occurrence,
        date(2024, 3, 11)
    );
}

#[test]
fn engine_pass_against_file_store() {
    let dir = tempdir().expect("tempdir");
    let store = Arc::new(JsonRecurrenceStore::open(dir.path().join("store.json")).unwrap());
    let daily = definition(Frequency::Daily, date(2024, 1, 1));
    let ended = RecurrenceDraft::new(
        Uuid::new_v4(),
        "100.00".parse().unwrap(),
        "Final rent",
        TransactionKind::Expense,
        Frequency::Monthly,
        date(2024, 1, 1),
    )
    .with_end_date(date(2024, 1, 20))
    .build()
    .unwrap();
    store.insert_definition(&daily).unwrap();
    store.insert_definition(&ended).unwrap();

    let engine = RecurrenceEngine::new(
        store.clone(),
        Arc::new(FixedClock::on(date(2024, 1, 1))),
    );
    let report = engine.process_due(date(2024, 1, 1));
    assert!(report.is_clean());
    assert_eq!(report.materialized_count, 2);
    assert_eq!(report.advanced_count, 1);
    assert_eq!(report.terminated_count, 1);

    let ended_after = store.definition(ended.id).unwrap().unwrap();
    assert!(!ended_after.is_active);
    assert_eq!(ended_after.next_occurrence, date(2024, 1, 1));

    let owner_window = DateWindow::new(date(2024, 1, 1), date(2024, 2, 1)).unwrap();
    let daily_txns = store.transactions_for(daily.owner_id, owner_window).unwrap();
    assert_eq!(daily_txns.len(), 1);
    assert_eq!(daily_txns[0].recurrence_id, daily.id);
}
