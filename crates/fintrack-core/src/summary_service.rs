//! Period summaries over materialized transactions.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use fintrack_domain::{DateWindow, MaterializedTransaction, TransactionKind};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{storage::RecurrenceStore, CoreError};

/// Label used for expenses without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub name: String,
    pub total: Decimal,
}

/// Income and spending for one owner over one calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlySummary {
    pub owner_id: Uuid,
    pub window: DateWindow,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net: Decimal,
    pub transaction_count: usize,
    pub top_categories: Vec<CategoryTotal>,
}

impl MonthlySummary {
    /// Month heading such as `February 2024`.
    pub fn month_label(&self) -> String {
        self.window.start.format("%B %Y").to_string()
    }
}

pub struct SummaryService;

impl SummaryService {
    /// The calendar month preceding the one that contains `today`.
    pub fn previous_month(today: NaiveDate) -> DateWindow {
        let current_start = today.with_day(1).unwrap_or(today);
        let (year, month) = if today.month() == 1 {
            (today.year() - 1, 12)
        } else {
            (today.year(), today.month() - 1)
        };
        let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(current_start);
        DateWindow {
            start,
            end: current_start,
        }
    }

    /// Aggregates `transactions` belonging to `owner_id` inside `window`.
    pub fn monthly_summary(
        transactions: &[MaterializedTransaction],
        owner_id: Uuid,
        window: DateWindow,
        top_n: usize,
    ) -> MonthlySummary {
        let mut total_income = Decimal::ZERO;
        let mut total_expenses = Decimal::ZERO;
        let mut transaction_count = 0usize;
        let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();

        for txn in transactions
            .iter()
            .filter(|txn| txn.owner_id == owner_id && window.contains(txn.date))
        {
            transaction_count += 1;
            match txn.kind {
                TransactionKind::Income => total_income += txn.amount,
                TransactionKind::Expense => {
                    total_expenses += txn.amount;
                    let name = txn
                        .category
                        .clone()
                        .unwrap_or_else(|| UNCATEGORIZED.to_string());
                    *by_category.entry(name).or_insert(Decimal::ZERO) += txn.amount;
                }
                TransactionKind::Transfer => {}
            }
        }

        let mut top_categories: Vec<CategoryTotal> = by_category
            .into_iter()
            .map(|(name, total)| CategoryTotal { name, total })
            .collect();
        top_categories.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
        top_categories.truncate(top_n);

        MonthlySummary {
            owner_id,
            window,
            total_income,
            total_expenses,
            net: total_income - total_expenses,
            transaction_count,
            top_categories,
        }
    }

    /// Summary of the month before `today`, or `None` when the owner had no activity.
    pub fn previous_month_report(
        store: &dyn RecurrenceStore,
        owner_id: Uuid,
        today: NaiveDate,
        top_n: usize,
    ) -> Result<Option<MonthlySummary>, CoreError> {
        let window = Self::previous_month(today);
        let transactions = store.transactions_for(owner_id, window)?;
        if transactions.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::monthly_summary(
            &transactions,
            owner_id,
            window,
            top_n,
        )))
    }
}
