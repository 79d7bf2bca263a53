#![doc(test(attr(deny(warnings))))]

//! FinTrack turns recurring income and expense definitions into dated
//! transactions. This crate wires configuration, the JSON store and the
//! recurrence engine into a job runner used by the `fintrack` binary.

pub mod errors;
pub mod jobs;
pub mod utils;

pub use errors::AppError;
pub use jobs::JobRunner;

pub use fintrack_config as config;
pub use fintrack_core as engine;
pub use fintrack_domain as domain;
pub use fintrack_storage_json as storage;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing with the default filter.
pub fn init() {
    init_with_filter(utils::DEFAULT_LOG_DIRECTIVE);
}

/// Initializes global tracing once. Later calls keep the first filter.
pub fn init_with_filter(directive: &str) {
    INIT_TRACING.call_once(|| {
        if utils::init_tracing(directive) {
            tracing::debug!("FinTrack tracing initialized.");
        }
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init_with_filter("fintrack=debug");
    }
}
