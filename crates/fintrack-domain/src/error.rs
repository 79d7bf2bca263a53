use chrono::NaiveDate;
use thiserror::Error;

/// Failures produced by calendar arithmetic on recurrence cursors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid frequency `{0}`")]
    InvalidFrequency(String),
    #[error("calendar overflow advancing from {0}")]
    CalendarOverflow(NaiveDate),
}

/// Validation failures raised while building domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(String),
    #[error("amount {0} has more than two decimal places")]
    AmountPrecision(String),
    #[error("description must not be empty")]
    EmptyDescription,
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error("first occurrence {first} is before start date {start}")]
    FirstBeforeStart { first: NaiveDate, start: NaiveDate },
    #[error("first occurrence {first} is after end date {end}")]
    FirstAfterEnd { first: NaiveDate, end: NaiveDate },
}
