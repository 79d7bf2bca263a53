//! Recurrence definitions and their activation state machine.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{normalize_amount, DomainError, Frequency, MaterializedTransaction, TransactionKind};

/// Persisted lifecycle of a definition. `Terminated` has no outgoing transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecurrenceState {
    Active,
    Terminated,
}

impl fmt::Display for RecurrenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecurrenceState::Active => "Active",
            RecurrenceState::Terminated => "Terminated",
        };
        f.write_str(label)
    }
}

/// Cursor change decided after materializing a due occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Stay active and move the cursor to `next`.
    Advance { next: NaiveDate },
    /// Deactivate; the cursor keeps its last value.
    Terminate,
}

/// A rule that produces one transaction per due occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceDefinition {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub kind: TransactionKind,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub next_occurrence: NaiveDate,
    pub is_active: bool,
}

impl RecurrenceDefinition {
    pub fn state(&self) -> RecurrenceState {
        if self.is_active {
            RecurrenceState::Active
        } else {
            RecurrenceState::Terminated
        }
    }

    /// Whether a pass run on `as_of` must process this definition.
    pub fn is_due(&self, as_of: NaiveDate) -> bool {
        self.is_active && self.next_occurrence <= as_of
    }

    /// Fields of the occurrence at the current cursor.
    pub fn due_occurrence(&self) -> DueOccurrence {
        DueOccurrence {
            recurrence_id: self.id,
            owner_id: self.owner_id,
            amount: self.amount,
            description: self.description.clone(),
            category: self.category.clone(),
            kind: self.kind,
            date: self.next_occurrence,
        }
    }

    /// Builds the transaction for the occurrence at the current cursor.
    pub fn materialize(&self, created_at: DateTime<Utc>) -> MaterializedTransaction {
        self.due_occurrence().materialize(created_at)
    }

    /// Decides the transition for a freshly computed next date. The end date is
    /// inclusive: only a date strictly after it terminates the series.
    pub fn transition_after(&self, next: NaiveDate) -> Transition {
        match self.end_date {
            Some(end) if next > end => Transition::Terminate,
            _ => Transition::Advance { next },
        }
    }

    pub fn apply(&mut self, transition: Transition) {
        if !self.is_active {
            return;
        }
        match transition {
            Transition::Advance { next } => self.next_occurrence = next,
            Transition::Terminate => self.is_active = false,
        }
    }

    /// Projects up to `count` upcoming occurrence dates starting at the cursor.
    /// The result grows with the dates produced, not with `count`.
    pub fn upcoming(&self, count: usize) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        if !self.is_active {
            return dates;
        }
        let mut cursor = self.next_occurrence;
        while dates.len() < count {
            if matches!(self.end_date, Some(end) if cursor > end) {
                break;
            }
            dates.push(cursor);
            match self.frequency.next_date(cursor) {
                Ok(next) => cursor = next,
                Err(_) => break,
            }
        }
        dates
    }
}

/// One due occurrence, independent of the definition's frequency. Stores hand
/// this out for rows whose frequency can no longer be parsed so the occurrence
/// is still recorded before the row is terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueOccurrence {
    pub recurrence_id: Uuid,
    pub owner_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub category: Option<String>,
    pub kind: TransactionKind,
    pub date: NaiveDate,
}

impl DueOccurrence {
    pub fn materialize(self, created_at: DateTime<Utc>) -> MaterializedTransaction {
        MaterializedTransaction {
            id: Uuid::new_v4(),
            owner_id: self.owner_id,
            amount: self.amount,
            description: self.description,
            category: self.category,
            kind: self.kind,
            date: self.date,
            notes: MaterializedTransaction::note_for(self.recurrence_id),
            recurrence_id: self.recurrence_id,
            is_recurring: true,
            created_at,
        }
    }
}

/// Caller-supplied fields for a new definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceDraft {
    pub owner_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub kind: TransactionKind,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Overrides the first cursor position; defaults to `start_date`.
    #[serde(default)]
    pub first_occurrence: Option<NaiveDate>,
}

impl RecurrenceDraft {
    pub fn new(
        owner_id: Uuid,
        amount: Decimal,
        description: impl Into<String>,
        kind: TransactionKind,
        frequency: Frequency,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            owner_id,
            amount,
            description: description.into(),
            category: None,
            kind,
            frequency,
            start_date,
            end_date: None,
            first_occurrence: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_first_occurrence(mut self, first: NaiveDate) -> Self {
        self.first_occurrence = Some(first);
        self
    }

    /// Validates the draft and produces an active definition.
    pub fn build(self) -> Result<RecurrenceDefinition, DomainError> {
        let amount = normalize_amount(self.amount)?;
        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(DomainError::EmptyDescription);
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(DomainError::EndBeforeStart {
                    start: self.start_date,
                    end,
                });
            }
        }
        let first = self.first_occurrence.unwrap_or(self.start_date);
        if first < self.start_date {
            return Err(DomainError::FirstBeforeStart {
                first,
                start: self.start_date,
            });
        }
        if let Some(end) = self.end_date {
            if first > end {
                return Err(DomainError::FirstAfterEnd { first, end });
            }
        }
        let category = self
            .category
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Ok(RecurrenceDefinition {
            id: Uuid::new_v4(),
            owner_id: self.owner_id,
            amount,
            description,
            category,
            kind: self.kind,
            frequency: self.frequency,
            start_date: self.start_date,
            end_date: self.end_date,
            next_occurrence: first,
            is_active: true,
        })
    }
}
