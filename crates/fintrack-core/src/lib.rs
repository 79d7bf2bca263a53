//! fintrack-core
//!
//! Recurrence engine and services for FinTrack.
//! Depends on fintrack-domain. No CLI, no terminal I/O; persistence goes through
//! the [`RecurrenceStore`] trait.

pub mod error;
pub mod memory_store;
pub mod recurrence_engine;
pub mod recurrence_service;
pub mod storage;
pub mod summary_service;
pub mod time;

pub use error::{CoreError, StoreError};
pub use memory_store::InMemoryStore;
pub use recurrence_engine::*;
pub use recurrence_service::*;
pub use storage::{DueEntry, RecurrenceStore, StoreResult};
pub use summary_service::*;
pub use time::{Clock, FixedClock, SystemClock};
