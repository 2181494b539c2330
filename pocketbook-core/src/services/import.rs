//! Import service - wires sessions and importers from configuration

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::adapters::memory::InMemoryExpenseStore;
use crate::config::{Config, ImportProfile};
use crate::domain::result::Error;
use crate::domain::{ColumnMapping, DateFormatHint};
use crate::ports::{ExpenseStore, IdentityProvider};

use super::importer::BatchedImporter;
use super::logging::LoggingService;
use super::parser::CsvParser;
use super::session::ImportSession;

pub struct ImportService {
    store: Arc<dyn ExpenseStore>,
    identity: Arc<dyn IdentityProvider>,
    data_dir: PathBuf,
    logger: Option<Arc<LoggingService>>,
}

impl ImportService {
    pub fn new(
        store: Arc<dyn ExpenseStore>,
        identity: Arc<dyn IdentityProvider>,
        data_dir: PathBuf,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        Self {
            store,
            identity,
            data_dir,
            logger,
        }
    }

    fn config(&self) -> Result<Config> {
        Config::load(&self.data_dir)
    }

    /// Read an upload, refusing files over the configured size before loading them
    pub fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let max = self.config()?.max_file_bytes;
        let size = std::fs::metadata(path)
            .with_context(|| format!("Cannot read {}", path.display()))?
            .len();
        if size > max as u64 {
            return Err(Error::parse(format!(
                "file is {} bytes, the limit is {} bytes",
                size, max
            ))
            .into());
        }
        std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))
    }

    /// A fresh session using the configured limits and amount policy
    pub fn new_session(&self) -> Result<ImportSession> {
        let config = self.config()?;
        Ok(
            ImportSession::new(CsvParser::new(config.max_file_bytes), config.amount_policy)
                .with_preview_limit(config.preview_limit)
                .with_logger(self.logger.clone()),
        )
    }

    /// Importer for the configured store, or a throwaway one for dry runs
    pub fn importer(&self, dry_run: bool) -> Result<BatchedImporter> {
        let config = self.config()?;
        let store: Arc<dyn ExpenseStore> = if dry_run {
            Arc::new(InMemoryExpenseStore::new())
        } else {
            Arc::clone(&self.store)
        };

        Ok(BatchedImporter::new(store, Arc::clone(&self.identity))
            .with_batch_size(config.batch_size)
            .with_batch_timeout(config.batch_timeout_secs.map(Duration::from_secs))
            .with_logger(self.logger.clone()))
    }

    pub fn list_profiles(&self) -> Result<BTreeMap<String, ImportProfile>> {
        Ok(self.config()?.import_profiles)
    }

    pub fn get_profile(&self, name: &str) -> Result<Option<ImportProfile>> {
        Ok(self.config()?.import_profiles.remove(name))
    }

    /// Save (or overwrite) a named mapping and date format
    pub fn save_profile(
        &self,
        name: &str,
        column_mapping: &ColumnMapping,
        date_format: DateFormatHint,
    ) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Profile name cannot be empty").into());
        }

        let mut config = self.config()?;
        config.import_profiles.insert(
            name.to_string(),
            ImportProfile {
                column_mapping: column_mapping.clone(),
                date_format,
            },
        );
        config.save(&self.data_dir)
    }
}
