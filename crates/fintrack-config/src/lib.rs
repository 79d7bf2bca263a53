//! fintrack-config
//!
//! Persistent settings for the recurrence job runner.
//! Owns the Config data structure plus disk persistence helpers.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::{resolve_base_dir, ConfigManager, HOME_ENV_VAR};
pub use model::{Config, CONFIG_KEYS};
