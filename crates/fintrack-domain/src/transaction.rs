//! Domain models for transactions produced by recurrence definitions.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of the note attached to every generated transaction.
pub const RECURRING_NOTE_PREFIX: &str = "Auto-generated from recurring transaction:";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Direction of money movement for a transaction.
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Income => "INCOME",
            TransactionKind::Expense => "EXPENSE",
            TransactionKind::Transfer => "TRANSFER",
        };
        f.write_str(label)
    }
}

/// Ledger entry created from one due occurrence. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaterializedTransaction {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub notes: String,
    pub recurrence_id: Uuid,
    pub is_recurring: bool,
    pub created_at: DateTime<Utc>,
}

impl MaterializedTransaction {
    pub fn note_for(recurrence_id: Uuid) -> String {
        format!("{RECURRING_NOTE_PREFIX} {recurrence_id}")
    }
}
