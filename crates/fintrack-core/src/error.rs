use std::io;

use chrono::NaiveDate;
use fintrack_domain::DomainError;
use thiserror::Error;
use uuid::Uuid;

/// Failures reported by a [`crate::RecurrenceStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Recurrence not found: {0}")]
    NotFound(Uuid),
    #[error("Recurrence {id} already exists")]
    Duplicate { id: Uuid },
    #[error("Recurrence {id} changed concurrently (expected cursor {expected})")]
    Conflict { id: Uuid, expected: NaiveDate },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("Recurrence not found: {0}")]
    RecurrenceNotFound(Uuid),
}
