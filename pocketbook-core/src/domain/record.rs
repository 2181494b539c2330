//! Import records - normalized candidates, row errors and persisted expenses

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Category used when no category column is mapped or the text is unknown
pub const DEFAULT_CATEGORY: &str = "Other";

/// Where a record's date came from
///
/// Dates can be recovered from columns the user never selected, so the
/// provenance travels with the record and is shown in the preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "column", rename_all = "snake_case")]
pub enum DateSource {
    /// The mapped date column
    Mapped,
    /// The mapped description column
    Description,
    /// Some other, unmapped column
    Column(String),
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSource::Mapped => f.write_str("date column"),
            DateSource::Description => f.write_str("description"),
            DateSource::Column(name) => write!(f, "column '{}'", name),
        }
    }
}

/// A normalized, not yet validated transaction derived from one raw row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRecord {
    pub source_row_index: usize,
    pub amount: Option<Decimal>,
    pub description: String,
    pub category: String,
    pub category_details: Option<Vec<String>>,
    pub date: Option<NaiveDate>,
    pub date_source: Option<DateSource>,
    /// Raw amount cell, when a mapped amount column had text
    pub raw_amount: Option<String>,
    /// Raw date cell, when a mapped date column had text
    pub raw_date: Option<String>,
}

/// Per-row validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowError {
    MissingAmount,
    InvalidAmount,
    NonPositiveAmount,
    MissingDate,
    InvalidDate,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            RowError::MissingAmount => "Missing amount",
            RowError::InvalidAmount => "Invalid amount",
            RowError::NonPositiveAmount => "Amount must be greater than zero",
            RowError::MissingDate => "Missing date",
            RowError::InvalidDate => "Invalid date",
        };
        f.write_str(msg)
    }
}

/// Row index -> ordered error list; rows without errors are absent
pub type ValidationErrors = BTreeMap<usize, Vec<RowError>>;

/// Persistence-ready expense, the element type of an import batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub user_id: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub category: String,
    pub category_details: Option<Vec<String>>,
    /// ISO-8601 date (YYYY-MM-DD)
    pub date: String,
}

impl NewExpense {
    /// Build from a valid candidate; returns None if amount or date is missing
    pub fn from_candidate(record: &CandidateRecord, user_id: &str) -> Option<Self> {
        let amount = record.amount?;
        let date = record.date?;
        let description = if record.description.is_empty() {
            None
        } else {
            Some(record.description.clone())
        };
        Some(Self {
            user_id: user_id.to_string(),
            amount,
            description,
            category: record.category.clone(),
            category_details: record.category_details.clone(),
            date: date.format("%Y-%m-%d").to_string(),
        })
    }
}

/// An expense as read back from the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredExpense {
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub category: String,
    pub category_details: Vec<String>,
    pub date: NaiveDate,
}

/// A batch that the store rejected
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    /// Zero-based batch position within the run
    pub batch_index: usize,
    /// Row indices of the records in the batch
    pub source_rows: Vec<usize>,
    pub message: String,
}

/// Aggregate result of one import run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportOutcome {
    pub success_count: usize,
    pub error_count: usize,
    pub validation_errors: ValidationErrors,
    pub failed_batches: Vec<BatchFailure>,
}

impl ImportOutcome {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> CandidateRecord {
        CandidateRecord {
            source_row_index: 0,
            amount: Some(Decimal::new(-4550, 2)),
            description: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            category_details: None,
            date: NaiveDate::from_ymd_opt(2025, 3, 1),
            date_source: Some(DateSource::Mapped),
            raw_amount: Some("-45,50".to_string()),
            raw_date: Some("01.03.25".to_string()),
        }
    }

    #[test]
    fn test_new_expense_from_candidate() {
        let expense = NewExpense::from_candidate(&candidate(), "user-1").unwrap();
        assert_eq!(expense.user_id, "user-1");
        assert_eq!(expense.amount, Decimal::new(-4550, 2));
        assert_eq!(expense.description, None);
        assert_eq!(expense.category, "Other");
        assert_eq!(expense.date, "2025-03-01");
    }

    #[test]
    fn test_new_expense_requires_amount_and_date() {
        let mut record = candidate();
        record.date = None;
        assert!(NewExpense::from_candidate(&record, "user-1").is_none());

        let mut record = candidate();
        record.amount = None;
        assert!(NewExpense::from_candidate(&record, "user-1").is_none());
    }

    #[test]
    fn test_row_error_messages() {
        assert_eq!(RowError::InvalidAmount.to_string(), "Invalid amount");
        assert_eq!(RowError::MissingAmount.to_string(), "Missing amount");
        assert_eq!(RowError::InvalidDate.to_string(), "Invalid date");
    }
}
