//! Job runner used by the `fintrack` binary and by schedulers embedding the crate.

use std::{fmt::Write as _, path::PathBuf, sync::Arc};

use chrono::NaiveDate;
use fintrack_config::{Config, ConfigManager};
use fintrack_core::{
    Clock, EngineOptions, MonthlySummary, ProcessingReport, RecurrenceEngine, RecurrenceService,
    SummaryService, SystemClock,
};
use fintrack_domain::{RecurrenceDefinition, RecurrenceDraft};
use fintrack_storage_json::JsonRecurrenceStore;
use uuid::Uuid;

use crate::AppError;

/// Owns the resolved configuration, the opened store and the clock for one invocation.
pub struct JobRunner {
    config: Config,
    store: Arc<JsonRecurrenceStore>,
    clock: Arc<dyn Clock>,
}

impl JobRunner {
    /// Loads configuration from `manager` and opens the JSON store. `store_override`
    /// takes precedence over the configured path.
    pub fn open(manager: &ConfigManager, store_override: Option<PathBuf>) -> Result<Self, AppError> {
        let config = manager.load()?;
        let store_path =
            store_override.unwrap_or_else(|| config.resolve_store_path(manager.base_dir()));
        tracing::debug!(store = %store_path.display(), "opening recurrence store");
        let store = JsonRecurrenceStore::open(store_path)?;
        Ok(Self::new(config, Arc::new(store)))
    }

    pub fn new(config: Config, store: Arc<JsonRecurrenceStore>) -> Self {
        Self {
            config,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &JsonRecurrenceStore {
        &self.store
    }

    /// Runs one pass. Per-definition failures land in the report, never in `Err`.
    pub fn process_recurring(
        &self,
        as_of: Option<NaiveDate>,
        workers: Option<usize>,
    ) -> Result<ProcessingReport, AppError> {
        let workers = workers.unwrap_or(self.config.workers);
        if workers == 0 {
            return Err(AppError::InvalidArgument(
                "workers must be at least 1".into(),
            ));
        }
        let engine = RecurrenceEngine::with_options(
            self.store.clone(),
            self.clock.clone(),
            EngineOptions { workers },
        );
        let report = match as_of {
            Some(date) => engine.process_due(date),
            None => engine.process_today(),
        };
        Ok(report)
    }

    pub fn add_recurring(&self, draft: RecurrenceDraft) -> Result<RecurrenceDefinition, AppError> {
        Ok(RecurrenceService::create(self.store.as_ref(), draft)?)
    }

    pub fn list_recurring(&self) -> Result<Vec<RecurrenceDefinition>, AppError> {
        Ok(RecurrenceService::list(self.store.as_ref())?)
    }

    pub fn upcoming(&self, id: Uuid, count: usize) -> Result<Vec<NaiveDate>, AppError> {
        Ok(RecurrenceService::upcoming(self.store.as_ref(), id, count)?)
    }

    /// Previous-month summary relative to `today`, defaulting to the clock's date.
    pub fn monthly_report(
        &self,
        owner_id: Uuid,
        today: Option<NaiveDate>,
    ) -> Result<Option<MonthlySummary>, AppError> {
        let today = today.unwrap_or_else(|| self.clock.today());
        Ok(SummaryService::previous_month_report(
            self.store.as_ref(),
            owner_id,
            today,
            self.config.report_top_categories,
        )?)
    }
}

/// Text printed after a pass: one line per failure, then the materialized total.
pub fn render_report(report: &ProcessingReport) -> String {
    let mut out = String::new();
    if let Some(err) = &report.listing_error {
        let _ = writeln!(out, "Error listing due recurring transactions: {err}");
    }
    for failure in &report.errors {
        let _ = writeln!(
            out,
            "Error processing recurring transaction {}: {}: {}",
            failure.definition_id, failure.kind, failure.message
        );
    }
    let _ = write!(
        out,
        "Processed {} recurring transactions",
        report.materialized_count
    );
    out
}

pub fn render_definition(definition: &RecurrenceDefinition) -> String {
    let end = definition
        .end_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}  {:<10}  {:<9}  {:>10}  next {}  until {}  {}",
        definition.id,
        definition.state(),
        definition.frequency,
        definition.amount,
        definition.next_occurrence,
        end,
        definition.description
    )
}

pub fn render_summary(summary: &MonthlySummary, currency: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Financial summary for {}", summary.month_label());
    let _ = writeln!(out, "Total income:   {} {}", summary.total_income, currency);
    let _ = writeln!(out, "Total expenses: {} {}", summary.total_expenses, currency);
    let _ = writeln!(out, "Net amount:     {} {}", summary.net, currency);
    let _ = write!(out, "Transactions:   {}", summary.transaction_count);
    if !summary.top_categories.is_empty() {
        let _ = write!(out, "\nTop spending categories:");
        for category in &summary.top_categories {
            let _ = write!(out, "\n  {}: {} {}", category.name, category.total, currency);
        }
    }
    out
}
