//! fintrack-domain
//!
//! Pure domain models for recurring transactions and their materialized output.
//! No I/O, no CLI, no storage. Only data types, calendar arithmetic, and core enums.

pub mod common;
pub mod error;
pub mod frequency;
pub mod money;
pub mod recurrence;
pub mod transaction;

pub use common::*;
pub use error::*;
pub use frequency::*;
pub use money::*;
pub use recurrence::*;
pub use transaction::*;
