//! Process-local store used by tests and embedders that persist elsewhere.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use chrono::NaiveDate;
use fintrack_domain::{DateWindow, MaterializedTransaction, RecurrenceDefinition, Transition};
use uuid::Uuid;

use crate::{
    storage::{ensure_commit_target, DueEntry, RecurrenceStore, StoreResult},
    StoreError,
};

#[derive(Debug, Default)]
struct MemoryState {
    definitions: BTreeMap<Uuid, RecurrenceDefinition>,
    transactions: Vec<MaterializedTransaction>,
}

/// Keeps definitions and transactions behind a single mutex so every commit is
/// applied as one unit.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definitions(definitions: impl IntoIterator<Item = RecurrenceDefinition>) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.lock() {
            for definition in definitions {
                state.definitions.insert(definition.id, definition);
            }
        }
        store
    }

    /// Snapshot of every transaction created so far, in creation order.
    pub fn transactions(&self) -> StoreResult<Vec<MaterializedTransaction>> {
        Ok(self.lock()?.transactions.clone())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

impl RecurrenceStore for InMemoryStore {
    fn list_due(&self, as_of: NaiveDate) -> StoreResult<Vec<DueEntry>> {
        let state = self.lock()?;
        Ok(state
            .definitions
            .values()
            .filter(|definition| definition.is_due(as_of))
            .cloned()
            .map(DueEntry::Ready)
            .collect())
    }

    fn commit_occurrence(
        &self,
        transaction: &MaterializedTransaction,
        transition: Transition,
    ) -> StoreResult<()> {
        let mut state = self.lock()?;
        let definition = state
            .definitions
            .get_mut(&transaction.recurrence_id)
            .ok_or(StoreError::NotFound(transaction.recurrence_id))?;
        ensure_commit_target(
            definition.id,
            definition.is_active,
            definition.next_occurrence,
            transaction.date,
        )?;
        definition.apply(transition);
        state.transactions.push(transaction.clone());
        Ok(())
    }

    fn insert_definition(&self, definition: &RecurrenceDefinition) -> StoreResult<()> {
        let mut state = self.lock()?;
        if state.definitions.contains_key(&definition.id) {
            return Err(StoreError::Duplicate { id: definition.id });
        }
        state.definitions.insert(definition.id, definition.clone());
        Ok(())
    }

    fn definition(&self, id: Uuid) -> StoreResult<Option<RecurrenceDefinition>> {
        Ok(self.lock()?.definitions.get(&id).cloned())
    }

    fn list_definitions(&self) -> StoreResult<Vec<RecurrenceDefinition>> {
        Ok(self.lock()?.definitions.values().cloned().collect())
    }

    fn transactions_for(
        &self,
        owner_id: Uuid,
        window: DateWindow,
    ) -> StoreResult<Vec<MaterializedTransaction>> {
        let state = self.lock()?;
        Ok(state
            .transactions
            .iter()
            .filter(|txn| txn.owner_id == owner_id && window.contains(txn.date))
            .cloned()
            .collect())
    }
}
