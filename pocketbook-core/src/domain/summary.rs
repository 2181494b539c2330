//! Aggregated expense summaries

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseSummary {
    pub total_expenses: i64,
    /// Sum of positive amounts
    pub income: f64,
    /// Sum of negative amounts (a negative number)
    pub spending: f64,
    pub by_category: Vec<CategoryTotal>,
    pub date_range: DateRange,
}

impl ExpenseSummary {
    pub fn net(&self) -> f64 {
        self.income + self.spending
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub count: i64,
    pub total: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DateRange {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}
