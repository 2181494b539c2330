//! Pocketbook Core - CSV bank statement import for personal finance
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: raw tables, column mappings, candidate records, errors
//! - **ports**: traits for the expense store and the identity collaborator
//! - **services**: the import pipeline and its orchestration
//! - **adapters**: DuckDB and in-memory stores, configuration-backed identity

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use adapters::duckdb::DuckDbExpenseStore;
use adapters::identity::StaticIdentity;
use config::Config;
use services::{ImportService, LoggingService, SessionRefresher, SummaryService};

pub use domain::result::{Error, OperationResult};
pub use domain::{CandidateRecord, ColumnMapping, ImportOutcome, NewExpense, User};

pub const DB_FILE: &str = "pocketbook.duckdb";

/// Main context for Pocketbook operations
///
/// Opens the expense database (running migrations), resolves the identity
/// from configuration and builds the services on top.
pub struct PocketbookContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub store: Arc<DuckDbExpenseStore>,
    pub identity: Arc<StaticIdentity>,
    pub import_service: ImportService,
    pub summary_service: SummaryService,
    logger: Option<Arc<LoggingService>>,
}

impl PocketbookContext {
    pub fn new(data_dir: &Path, logger: Option<Arc<LoggingService>>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let store = Arc::new(DuckDbExpenseStore::new(&data_dir.join(DB_FILE))?);
        store.ensure_schema()?;

        let identity = Arc::new(StaticIdentity::from_config(&config));

        let import_service = ImportService::new(
            store.clone(),
            identity.clone(),
            data_dir.to_path_buf(),
            logger.clone(),
        );
        let summary_service = SummaryService::new(store.clone(), identity.clone());

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            store,
            identity,
            import_service,
            summary_service,
            logger,
        })
    }

    /// Start refreshing the identity session in the background
    ///
    /// Must be called from within a tokio runtime. Stop the returned handle
    /// when the command finishes.
    pub fn start_session_refresh(&self) -> SessionRefresher {
        SessionRefresher::start(
            self.identity.clone(),
            Duration::from_secs(self.config.session_refresh_secs.max(1)),
            self.logger.clone(),
        )
    }
}
