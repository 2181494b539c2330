//! Batched importer - persists valid records in fixed-size batches

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{BatchFailure, CandidateRecord, ImportOutcome, NewExpense, ValidationErrors};
use crate::ports::{ExpenseStore, IdentityProvider};

use super::logging::{LogEvent, LoggingService};

pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Snapshot passed to the progress callback after each batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    pub batches_done: usize,
    pub batch_count: usize,
    pub success_count: usize,
    pub error_count: usize,
}

pub type ProgressCallback = Arc<dyn Fn(ImportProgress) + Send + Sync>;

/// Sends valid records to the store, one batch at a time
///
/// A failed batch is counted and reported but never retried, and later
/// batches still run.
pub struct BatchedImporter {
    store: Arc<dyn ExpenseStore>,
    identity: Arc<dyn IdentityProvider>,
    batch_size: usize,
    batch_timeout: Option<Duration>,
    logger: Option<Arc<LoggingService>>,
    progress: Option<ProgressCallback>,
}

impl BatchedImporter {
    pub fn new(store: Arc<dyn ExpenseStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            identity,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout: None,
            logger: None,
            progress: None,
        }
    }

    /// Records per insert call (at least one)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Count a batch as failed when the store takes longer than this
    pub fn with_batch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.batch_timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: Option<Arc<LoggingService>>) -> Self {
        self.logger = logger;
        self
    }

    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Import every record that has no validation errors
    ///
    /// Fails before touching the store when nobody is signed in or when no
    /// record is valid. Otherwise always returns an outcome, whatever the
    /// number of failed batches.
    pub async fn import(
        &self,
        records: &[CandidateRecord],
        errors: &ValidationErrors,
    ) -> Result<ImportOutcome> {
        let user = self
            .identity
            .current_user()
            .await?
            .ok_or(Error::AuthRequired)?;

        let valid: Vec<(usize, NewExpense)> = records
            .iter()
            .filter(|r| !errors.contains_key(&r.source_row_index))
            .filter_map(|r| {
                NewExpense::from_candidate(r, &user.id).map(|e| (r.source_row_index, e))
            })
            .collect();

        if valid.is_empty() {
            return Err(Error::NoValidRecords);
        }

        let batch_count = valid.len().div_ceil(self.batch_size);
        let mut outcome = ImportOutcome {
            validation_errors: errors.clone(),
            ..Default::default()
        };

        self.log(
            LogEvent::new("import_started")
                .with_stage("import")
                .with_row_count(valid.len()),
        );

        for (batch_index, chunk) in valid.chunks(self.batch_size).enumerate() {
            let expenses: Vec<NewExpense> = chunk.iter().map(|(_, e)| e.clone()).collect();

            match self.persist(&expenses).await {
                Ok(()) => outcome.success_count += chunk.len(),
                Err(e) => {
                    let failure = Error::BatchPersist {
                        batch_index,
                        message: e.to_string(),
                    };
                    self.log(
                        LogEvent::new("batch_failed")
                            .with_stage("import")
                            .with_batch(batch_index)
                            .with_row_count(chunk.len())
                            .with_error(failure.to_string()),
                    );
                    outcome.error_count += chunk.len();
                    outcome.failed_batches.push(BatchFailure {
                        batch_index,
                        source_rows: chunk.iter().map(|(idx, _)| *idx).collect(),
                        message: failure.to_string(),
                    });
                }
            }

            if let Some(progress) = &self.progress {
                progress(ImportProgress {
                    batches_done: batch_index + 1,
                    batch_count,
                    success_count: outcome.success_count,
                    error_count: outcome.error_count,
                });
            }
        }

        self.log(
            LogEvent::new("import_completed")
                .with_stage("import")
                .with_row_count(outcome.success_count),
        );

        Ok(outcome)
    }

    async fn persist(&self, batch: &[NewExpense]) -> Result<()> {
        let insert = self.store.insert_expenses(batch);
        match self.batch_timeout {
            Some(limit) => tokio::time::timeout(limit, insert).await.map_err(|_| {
                Error::database(format!("insert timed out after {}s", limit.as_secs()))
            })?,
            None => insert.await,
        }
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event);
        }
    }
}
