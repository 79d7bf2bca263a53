use chrono::NaiveDate;
use fintrack_domain::{
    DateWindow, DueOccurrence, MaterializedTransaction, RecurrenceDefinition, Transition,
};
use uuid::Uuid;

use crate::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// A due row as read from durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DueEntry {
    Ready(RecurrenceDefinition),
    /// The stored frequency code is outside the supported set. The occurrence
    /// at the cursor is still due; the row cannot be advanced past it.
    Unschedulable {
        occurrence: DueOccurrence,
        frequency: String,
    },
}

impl DueEntry {
    pub fn id(&self) -> Uuid {
        match self {
            DueEntry::Ready(definition) => definition.id,
            DueEntry::Unschedulable { occurrence, .. } => occurrence.recurrence_id,
        }
    }
}

/// Abstraction over persistence backends holding recurrence definitions and the
/// transactions they produce.
pub trait RecurrenceStore: Send + Sync {
    /// Active definitions whose cursor is on or before `as_of`.
    fn list_due(&self, as_of: NaiveDate) -> StoreResult<Vec<DueEntry>>;

    /// Creates `transaction` and applies `transition` to its originating definition
    /// as one unit: either both are durable or neither is.
    ///
    /// Implementations reject the unit with [`StoreError::Conflict`] when the
    /// definition is no longer active or its cursor moved away from
    /// `transaction.date`. The check must not depend on the stored frequency
    /// being parseable, since unschedulable rows are committed here too.
    fn commit_occurrence(
        &self,
        transaction: &MaterializedTransaction,
        transition: Transition,
    ) -> StoreResult<()>;

    fn insert_definition(&self, definition: &RecurrenceDefinition) -> StoreResult<()>;

    fn definition(&self, id: Uuid) -> StoreResult<Option<RecurrenceDefinition>>;

    fn list_definitions(&self) -> StoreResult<Vec<RecurrenceDefinition>>;

    fn transactions_for(
        &self,
        owner_id: Uuid,
        window: DateWindow,
    ) -> StoreResult<Vec<MaterializedTransaction>>;
}

/// Checks that the row `id`, with activation flag `is_active` and cursor
/// `cursor`, can accept an occurrence dated `date`.
pub fn ensure_commit_target(
    id: Uuid,
    is_active: bool,
    cursor: NaiveDate,
    date: NaiveDate,
) -> StoreResult<()> {
    if !is_active || cursor != date {
        return Err(StoreError::Conflict { id, expected: date });
    }
    Ok(())
}
