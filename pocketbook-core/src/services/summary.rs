//! Summary service - aggregated totals for the signed-in user

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::duckdb::DuckDbExpenseStore;
use crate::domain::{ExpenseSummary, StoredExpense};
use crate::ports::IdentityProvider;

pub struct SummaryService {
    store: Arc<DuckDbExpenseStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl SummaryService {
    pub fn new(store: Arc<DuckDbExpenseStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    async fn user_id(&self) -> Result<String> {
        let user = self
            .identity
            .current_user()
            .await?
            .context("No user configured; set userId in settings.json or POCKETBOOK_USER_ID")?;
        Ok(user.id)
    }

    /// Income, spending, per-category totals and date range
    pub async fn get_summary(&self) -> Result<ExpenseSummary> {
        let user_id = self.user_id().await?;
        self.store.summarize(&user_id)
    }

    /// Most recent expenses, newest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<StoredExpense>> {
        let user_id = self.user_id().await?;
        self.store.list_expenses(&user_id, limit)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::adapters::identity::StaticIdentity;
    use crate::domain::NewExpense;

    fn store() -> Arc<DuckDbExpenseStore> {
        let store = DuckDbExpenseStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store
            .insert_batch(&[NewExpense {
                user_id: "u1".to_string(),
                amount: Decimal::new(-999, 2),
                description: None,
                category: "Food".to_string(),
                category_details: None,
                date: "2025-03-01".to_string(),
            }])
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_summary_for_signed_in_user() {
        let service = SummaryService::new(store(), Arc::new(StaticIdentity::signed_in("u1")));
        let summary = service.get_summary().await.unwrap();
        assert_eq!(summary.total_expenses, 1);
        assert_eq!(service.recent(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_summary_requires_user() {
        let service = SummaryService::new(store(), Arc::new(StaticIdentity::signed_out()));
        assert!(service.get_summary().await.is_err());
    }
}
