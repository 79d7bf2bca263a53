//! Services related to recurrence definition maintenance.

use chrono::NaiveDate;
use fintrack_domain::{RecurrenceDefinition, RecurrenceDraft};
use uuid::Uuid;

use crate::{storage::RecurrenceStore, CoreError};

/// Largest number of dates a single [`RecurrenceService::upcoming`] call returns.
pub const MAX_UPCOMING: usize = 1000;

/// Validated entry points for creating and inspecting recurrence definitions.
pub struct RecurrenceService;

impl RecurrenceService {
    /// Validates `draft` and persists the resulting active definition.
    pub fn create(
        store: &dyn RecurrenceStore,
        draft: RecurrenceDraft,
    ) -> Result<RecurrenceDefinition, CoreError> {
        let definition = draft.build()?;
        store.insert_definition(&definition)?;
        tracing::info!(
            id = %definition.id,
            frequency = %definition.frequency,
            first = %definition.next_occurrence,
            "recurrence created"
        );
        Ok(definition)
    }

    pub fn get(store: &dyn RecurrenceStore, id: Uuid) -> Result<RecurrenceDefinition, CoreError> {
        store
            .definition(id)?
            .ok_or(CoreError::RecurrenceNotFound(id))
    }

    /// Lists definitions ordered by cursor, active ones first.
    pub fn list(store: &dyn RecurrenceStore) -> Result<Vec<RecurrenceDefinition>, CoreError> {
        let mut definitions = store.list_definitions()?;
        definitions.sort_by_key(|definition| {
            (!definition.is_active, definition.next_occurrence, definition.id)
        });
        Ok(definitions)
    }

    /// Previews the next `count` occurrence dates without changing any state.
    /// `count` is capped at [`MAX_UPCOMING`].
    pub fn upcoming(
        store: &dyn RecurrenceStore,
        id: Uuid,
        count: usize,
    ) -> Result<Vec<NaiveDate>, CoreError> {
        Ok(Self::get(store, id)?.upcoming(count.min(MAX_UPCOMING)))
    }
}
