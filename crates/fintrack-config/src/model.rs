use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const STORE_FILE_NAME: &str = "recurrences.json";

/// Keys accepted by [`Config::set`].
pub const CONFIG_KEYS: [&str; 5] = [
    "store_path",
    "workers",
    "log_filter",
    "report_top_categories",
    "currency",
];

/// Settings for the recurrence job runner and its reports. Missing fields take
/// their default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional JSON store location. Defaults to `<base>/data/recurrences.json`.
    pub store_path: Option<PathBuf>,
    pub workers: usize,
    pub log_filter: String,
    pub report_top_categories: usize,
    /// Currency code printed next to report amounts.
    pub currency: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: None,
            workers: Self::default_workers(),
            log_filter: Self::default_log_filter(),
            report_top_categories: Self::default_report_top_categories(),
            currency: Self::default_currency(),
        }
    }
}

impl Config {
    pub fn default_workers() -> usize {
        1
    }

    pub fn default_log_filter() -> String {
        "fintrack=info".into()
    }

    pub fn default_report_top_categories() -> usize {
        5
    }

    pub fn default_currency() -> String {
        "USD".into()
    }

    pub fn resolve_store_path(&self, base: &Path) -> PathBuf {
        if let Some(path) = &self.store_path {
            return path.clone();
        }
        base.join("data").join(STORE_FILE_NAME)
    }

    /// Rejects values the job runner cannot act on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid("log_filter must not be empty".into()));
        }
        if self.currency.trim().is_empty() {
            return Err(ConfigError::Invalid("currency must not be empty".into()));
        }
        Ok(())
    }

    /// Sets one field from its textual form. An empty `store_path` clears it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key {
            "store_path" => {
                self.store_path = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "workers" => self.workers = parse_count(key, value)?,
            "log_filter" => self.log_filter = value.to_string(),
            "report_top_categories" => self.report_top_categories = parse_count(key, value)?,
            "currency" => self.currency = value.to_ascii_uppercase(),
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "unknown key `{key}` (expected one of: {})",
                    CONFIG_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key} must be a whole number, got `{value}`")))
}
