//! In-memory expense store
//!
//! Used for `--dry-run` imports and in tests. Specific insert calls can be
//! made to fail to exercise partial-failure handling.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::result::{Error, Result};
use crate::domain::NewExpense;
use crate::ports::ExpenseStore;

#[derive(Default)]
pub struct InMemoryExpenseStore {
    expenses: Mutex<Vec<NewExpense>>,
    calls: AtomicUsize,
    failing_calls: HashSet<usize>,
}

impl InMemoryExpenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the n-th insert call (zero-based) fail
    pub fn fail_on_call(mut self, call_index: usize) -> Self {
        self.failing_calls.insert(call_index);
        self
    }

    /// Number of insert calls so far, failed ones included
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn expenses(&self) -> Vec<NewExpense> {
        self.expenses
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.expenses.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ExpenseStore for InMemoryExpenseStore {
    async fn insert_expenses(&self, expenses: &[NewExpense]) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_calls.contains(&call) {
            return Err(Error::database(format!("insert call {} rejected", call)));
        }

        let mut stored = self
            .expenses
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))?;
        stored.extend_from_slice(expenses);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn expense() -> NewExpense {
        NewExpense {
            user_id: "u1".to_string(),
            amount: Decimal::ONE,
            description: None,
            category: "Other".to_string(),
            category_details: None,
            date: "2025-03-01".to_string(),
        }
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryExpenseStore::new().fail_on_call(0);
        assert!(store.insert_expenses(&[expense()]).await.is_err());
        assert!(store.insert_expenses(&[expense(), expense()]).await.is_ok());
        assert_eq!(store.call_count(), 2);
        assert_eq!(store.len(), 2);
    }
}
