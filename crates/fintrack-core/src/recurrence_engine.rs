//! Turns due recurrence definitions into transactions and moves their cursors.

use std::{fmt, sync::Arc, thread};

use chrono::NaiveDate;
use crossbeam_channel::{bounded, unbounded};
use fintrack_domain::{advance_date, RecurrenceState, ScheduleError, Transition};
use uuid::Uuid;

use crate::{
    storage::{DueEntry, RecurrenceStore},
    time::Clock,
};

/// Why a single definition could not be processed cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidFrequency,
    PersistenceFailure,
    CalendarOverflow,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::InvalidFrequency => "invalid frequency",
            FailureKind::PersistenceFailure => "persistence failure",
            FailureKind::CalendarOverflow => "calendar overflow",
        };
        f.write_str(label)
    }
}

impl From<&ScheduleError> for FailureKind {
    fn from(err: &ScheduleError) -> Self {
        match err {
            ScheduleError::InvalidFrequency(_) => FailureKind::InvalidFrequency,
            ScheduleError::CalendarOverflow(_) => FailureKind::CalendarOverflow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionFailure {
    pub definition_id: Uuid,
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for DefinitionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.definition_id, self.kind, self.message)
    }
}

/// Outcome of one pass. A pass never fails as a whole; problems are listed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingReport {
    pub as_of: NaiveDate,
    pub materialized_count: usize,
    pub advanced_count: usize,
    pub terminated_count: usize,
    pub errors: Vec<DefinitionFailure>,
    /// Set when the due definitions could not be read at all.
    pub listing_error: Option<String>,
}

impl ProcessingReport {
    fn empty(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            materialized_count: 0,
            advanced_count: 0,
            terminated_count: 0,
            errors: Vec::new(),
            listing_error: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.listing_error.is_none()
    }

    fn record(&mut self, outcome: EntryOutcome) {
        if outcome.materialized {
            self.materialized_count += 1;
        }
        match outcome.state {
            Some(RecurrenceState::Active) => self.advanced_count += 1,
            Some(RecurrenceState::Terminated) => self.terminated_count += 1,
            None => {}
        }
        if let Some(failure) = outcome.failure {
            self.errors.push(failure);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Upper bound on definitions processed concurrently. `1` runs inline.
    pub workers: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

#[derive(Debug, Default)]
struct EntryOutcome {
    materialized: bool,
    state: Option<RecurrenceState>,
    failure: Option<DefinitionFailure>,
}

/// Drives processing passes over a [`RecurrenceStore`].
pub struct RecurrenceEngine {
    store: Arc<dyn RecurrenceStore>,
    clock: Arc<dyn Clock>,
    options: EngineOptions,
}

impl RecurrenceEngine {
    pub fn new(store: Arc<dyn RecurrenceStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_options(store, clock, EngineOptions::default())
    }

    pub fn with_options(
        store: Arc<dyn RecurrenceStore>,
        clock: Arc<dyn Clock>,
        options: EngineOptions,
    ) -> Self {
        Self {
            store,
            clock,
            options,
        }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Runs a pass for the clock's current date.
    pub fn process_today(&self) -> ProcessingReport {
        self.process_due(self.clock.today())
    }

    /// Materializes every definition due on or before `as_of`, one occurrence each.
    pub fn process_due(&self, as_of: NaiveDate) -> ProcessingReport {
        let mut report = ProcessingReport::empty(as_of);
        let entries = match self.store.list_due(as_of) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!(%as_of, error = %err, "failed to list due recurrences");
                report.listing_error = Some(err.to_string());
                return report;
            }
        };
        tracing::debug!(%as_of, due = entries.len(), "processing due recurrences");

        let workers = self.options.workers.max(1).min(entries.len().max(1));
        let outcomes: Vec<EntryOutcome> = if workers == 1 {
            entries
                .into_iter()
                .map(|entry| self.process_entry(as_of, entry))
                .collect()
        } else {
            self.process_pooled(as_of, entries, workers)
        };
        for outcome in outcomes {
            report.record(outcome);
        }
        report.errors.sort_by_key(|failure| failure.definition_id);

        tracing::info!(
            %as_of,
            materialized = report.materialized_count,
            advanced = report.advanced_count,
            terminated = report.terminated_count,
            errors = report.errors.len(),
            "recurrence pass finished"
        );
        report
    }

    fn process_pooled(
        &self,
        as_of: NaiveDate,
        entries: Vec<DueEntry>,
        workers: usize,
    ) -> Vec<EntryOutcome> {
        let (job_tx, job_rx) = bounded::<DueEntry>(workers * 2);
        let (outcome_tx, outcome_rx) = unbounded::<EntryOutcome>();
        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let outcome_tx = outcome_tx.clone();
                scope.spawn(move || {
                    for entry in job_rx.iter() {
                        if outcome_tx.send(self.process_entry(as_of, entry)).is_err() {
                            break;
                        }
                    }
                });
            }
            for entry in entries {
                if job_tx.send(entry).is_err() {
                    break;
                }
            }
            drop(job_tx);
        });
        drop(outcome_tx);
        outcome_rx.iter().collect()
    }

    fn process_entry(&self, as_of: NaiveDate, entry: DueEntry) -> EntryOutcome {
        let (occurrence, transition, schedule_error) = match entry {
            DueEntry::Ready(definition) => {
                if !definition.is_due(as_of) {
                    tracing::debug!(id = %definition.id, "skipping definition that is not due");
                    return EntryOutcome::default();
                }
                let (transition, schedule_error) =
                    match advance_date(definition.next_occurrence, definition.frequency) {
                        Ok(next) => (definition.transition_after(next), None),
                        Err(err) => (Transition::Terminate, Some(err)),
                    };
                (definition.due_occurrence(), transition, schedule_error)
            }
            DueEntry::Unschedulable {
                occurrence,
                frequency,
            } => {
                if occurrence.date > as_of {
                    tracing::debug!(
                        id = %occurrence.recurrence_id,
                        "skipping definition that is not due"
                    );
                    return EntryOutcome::default();
                }
                // The due occurrence is recorded; only the advance is impossible.
                let err = ScheduleError::InvalidFrequency(frequency);
                (occurrence, Transition::Terminate, Some(err))
            }
        };

        let id = occurrence.recurrence_id;
        let due = occurrence.date;
        let transaction = occurrence.materialize(self.clock.now());
        if let Err(err) = self.store.commit_occurrence(&transaction, transition) {
            tracing::error!(
                %id,
                %due,
                error = %err,
                "failed to persist recurring occurrence"
            );
            return EntryOutcome {
                failure: Some(DefinitionFailure {
                    definition_id: id,
                    kind: FailureKind::PersistenceFailure,
                    message: err.to_string(),
                }),
                ..EntryOutcome::default()
            };
        }

        let state = match transition {
            Transition::Advance { next } => {
                tracing::debug!(%id, %next, "recurrence advanced");
                RecurrenceState::Active
            }
            Transition::Terminate => {
                tracing::info!(%id, "recurrence terminated");
                RecurrenceState::Terminated
            }
        };
        let failure = schedule_error.map(|err| {
            tracing::warn!(%id, error = %err, "recurrence cannot advance");
            DefinitionFailure {
                definition_id: id,
                kind: FailureKind::from(&err),
                message: err.to_string(),
            }
        });
        EntryOutcome {
            materialized: true,
            state: Some(state),
            failure,
        }
    }
}
