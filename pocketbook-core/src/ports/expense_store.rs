//! Expense store port - bulk persistence of imported expenses

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::NewExpense;

/// Relational store abstraction used by the importer
///
/// One call persists one batch. An implementation either stores the whole
/// slice or returns an error; the importer counts a failed call against every
/// record in it.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Insert a batch of expenses
    async fn insert_expenses(&self, expenses: &[NewExpense]) -> Result<()>;
}
