//! DuckDB expense store

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result as CoreResult};
use crate::domain::{CategoryTotal, DateRange, ExpenseSummary, NewExpense, StoredExpense};
use crate::ports::ExpenseStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// First retry delay; doubles on every attempt
const INITIAL_RETRY_DELAY_MS: u64 = 50;

fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Expense persistence backed by pocketbook.duckdb
pub struct DuckDbExpenseStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbExpenseStore {
    /// Open (or create) the database file
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    })
                }
                Err(e) if is_retryable_error(&e.to_string()) && attempt + 1 < MAX_RETRIES => {
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    eprintln!(
                        "[pocketbook] Database busy, retrying in {}ms (attempt {}/{}): {}",
                        delay.as_millis(),
                        attempt + 1,
                        MAX_RETRIES,
                        e
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to open database {}", db_path.display())
                    })
                }
            }
        }
    }

    /// Throwaway database for dry runs and tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading off: cached extensions can fail code signing on macOS
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure the schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Insert a batch inside one transaction: all rows or none
    pub fn insert_batch(&self, expenses: &[NewExpense]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for expense in expenses {
            // Array parameters are not supported by the binding, so the
            // details list goes in as a literal
            let sql = format!(
                "INSERT INTO expenses (id, user_id, amount, description, category, category_details, date)
                 VALUES (?, ?, ?::DECIMAL(15, 2), ?, ?, {}, ?::DATE)",
                format_details_array(expense.category_details.as_deref())
            );
            tx.execute(
                &sql,
                params![
                    Uuid::new_v4().to_string(),
                    expense.user_id,
                    expense.amount.to_string(),
                    expense.description,
                    expense.category,
                    expense.date,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn count_expenses(&self, user_id: &str) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM expenses WHERE user_id = ?",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// A user's expenses, newest first
    pub fn list_expenses(&self, user_id: &str, limit: usize) -> Result<Vec<StoredExpense>> {
        let conn = self.lock()?;
        // duckdb-rs reads neither DECIMAL nor VARCHAR[] into Rust types directly,
        // so amounts come back as text and the details list as JSON
        let mut stmt = conn.prepare(
            "SELECT id, user_id, amount::VARCHAR, description, category,
                    to_json(category_details)::VARCHAR, date::VARCHAR
             FROM expenses
             WHERE user_id = ?
             ORDER BY date DESC, created_at DESC
             LIMIT ?",
        )?;

        let rows = stmt
            .query_map(params![user_id, limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, user_id, amount, description, category, details, date)| -> Result<StoredExpense> {
                Ok(StoredExpense {
                    id,
                    user_id,
                    amount: Decimal::from_str(&amount)
                        .with_context(|| format!("Bad amount in database: {}", amount))?,
                    description,
                    category,
                    category_details: match details {
                        Some(json) => serde_json::from_str(&json)
                            .with_context(|| format!("Bad category details in database: {}", json))?,
                        None => Vec::new(),
                    },
                    date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                        .with_context(|| format!("Bad date in database: {}", date))?,
                })
            })
            .collect()
    }

    /// Totals for a user: income, spending, per category and date range
    pub fn summarize(&self, user_id: &str) -> Result<ExpenseSummary> {
        let conn = self.lock()?;

        let (total_expenses, income, spending, earliest, latest): (
            i64,
            f64,
            f64,
            Option<String>,
            Option<String>,
        ) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN amount > 0 THEN amount ELSE 0 END), 0)::DOUBLE,
                    COALESCE(SUM(CASE WHEN amount < 0 THEN amount ELSE 0 END), 0)::DOUBLE,
                    MIN(date)::VARCHAR,
                    MAX(date)::VARCHAR
             FROM expenses
             WHERE user_id = ?",
            [user_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )?;

        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*), SUM(amount)::DOUBLE
             FROM expenses
             WHERE user_id = ?
             GROUP BY category
             ORDER BY ABS(SUM(amount)) DESC, category",
        )?;
        let by_category = stmt
            .query_map([user_id], |row| {
                Ok(CategoryTotal {
                    category: row.get(0)?,
                    count: row.get(1)?,
                    total: row.get(2)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        Ok(ExpenseSummary {
            total_expenses,
            income,
            spending,
            by_category,
            date_range: DateRange { earliest, latest },
        })
    }
}

#[async_trait]
impl ExpenseStore for DuckDbExpenseStore {
    async fn insert_expenses(&self, expenses: &[NewExpense]) -> CoreResult<()> {
        self.insert_batch(expenses)
            .map_err(|e| Error::database(format!("{:#}", e)))
    }
}

/// DuckDB list literal: ['a', 'b'], or NULL when there are no details
fn format_details_array(details: Option<&[String]>) -> String {
    match details {
        None => "NULL".to_string(),
        Some(items) => {
            let escaped: Vec<String> = items
                .iter()
                .map(|t| format!("'{}'", t.replace('\'', "''")))
                .collect();
            format!("[{}]", escaped.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DuckDbExpenseStore {
        let store = DuckDbExpenseStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store
    }

    fn expense(user: &str, cents: i64, category: &str, date: &str) -> NewExpense {
        NewExpense {
            user_id: user.to_string(),
            amount: Decimal::new(cents, 2),
            description: Some("REWE Markt".to_string()),
            category: category.to_string(),
            category_details: None,
            date: date.to_string(),
        }
    }

    #[test]
    fn test_insert_and_list() {
        let store = store();
        let mut with_details = expense("u1", -4550, "Food", "2025-03-01");
        with_details.category_details = Some(vec!["Food: Groceries".to_string()]);
        store
            .insert_batch(&[with_details, expense("u1", 120000, "Other", "2025-02-28")])
            .unwrap();

        let listed = store.list_expenses("u1", 10).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(listed[0].amount, Decimal::new(-4550, 2));
        assert_eq!(listed[0].category_details, vec!["Food: Groceries".to_string()]);
        assert_eq!(listed[1].category_details, Vec::<String>::new());
        assert_eq!(listed[1].description.as_deref(), Some("REWE Markt"));
    }

    #[test]
    fn test_category_details_with_commas_and_quotes_round_trip() {
        let store = store();
        let mut rent = expense("u1", -85000, "Other", "2025-03-01");
        rent.category_details = Some(vec![
            "Other: Miete, Nebenkosten".to_string(),
            "Other: \"Bob's\" [flat]".to_string(),
        ]);
        store.insert_batch(&[rent]).unwrap();

        let listed = store.list_expenses("u1", 10).unwrap();
        assert_eq!(
            listed[0].category_details,
            vec![
                "Other: Miete, Nebenkosten".to_string(),
                "Other: \"Bob's\" [flat]".to_string(),
            ]
        );
    }

    #[test]
    fn test_failed_batch_is_rolled_back() {
        let store = store();
        let good = expense("u1", 100, "Other", "2025-03-01");
        let bad = expense("u1", 100, "Other", "not-a-date");

        assert!(store.insert_batch(&[good, bad]).is_err());
        assert_eq!(store.count_expenses("u1").unwrap(), 0);
    }

    #[test]
    fn test_counts_are_per_user() {
        let store = store();
        store
            .insert_batch(&[
                expense("u1", 100, "Other", "2025-03-01"),
                expense("u2", 100, "Other", "2025-03-01"),
            ])
            .unwrap();
        assert_eq!(store.count_expenses("u1").unwrap(), 1);
        assert_eq!(store.count_expenses("u3").unwrap(), 0);
    }

    #[test]
    fn test_summarize() {
        let store = store();
        store
            .insert_batch(&[
                expense("u1", -4550, "Food", "2025-03-01"),
                expense("u1", -1000, "Food", "2025-03-05"),
                expense("u1", 250000, "Other", "2025-02-01"),
            ])
            .unwrap();

        let summary = store.summarize("u1").unwrap();
        assert_eq!(summary.total_expenses, 3);
        assert!((summary.income - 2500.0).abs() < 1e-9);
        assert!((summary.spending + 55.5).abs() < 1e-9);
        assert_eq!(summary.date_range.earliest.as_deref(), Some("2025-02-01"));
        assert_eq!(summary.date_range.latest.as_deref(), Some("2025-03-05"));
        assert_eq!(summary.by_category[0].category, "Other");
        assert_eq!(summary.by_category[1].count, 2);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = store().summarize("nobody").unwrap();
        assert_eq!(summary.total_expenses, 0);
        assert_eq!(summary.income, 0.0);
        assert!(summary.by_category.is_empty());
        assert!(summary.date_range.earliest.is_none());
    }

    #[tokio::test]
    async fn test_port_maps_errors_to_database() {
        let store = DuckDbExpenseStore::open_in_memory().unwrap();
        // No schema: the insert must fail
        let err = store
            .insert_expenses(&[expense("u1", 100, "Other", "2025-03-01")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_format_details_array() {
        assert_eq!(format_details_array(None), "NULL");
        assert_eq!(
            format_details_array(Some(&["Other: Bob's".to_string()])),
            "['Other: Bob''s']"
        );
    }
}
