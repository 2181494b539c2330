//! CLI command implementations

pub mod import;
pub mod logs;
pub mod setup;
pub mod summary;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use pocketbook_core::services::{LogEvent, LoggingService};
use pocketbook_core::PocketbookContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<Arc<LoggingService>> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, env!("CARGO_PKG_VERSION"))
        .ok()
        .map(Arc::new)
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

pub fn log_command(logger: &Option<Arc<LoggingService>>, command: &str) {
    if let Some(l) = logger {
        let _ = l.log_command(command);
    }
}

/// Data directory from `POCKETBOOK_DIR`, or `~/.pocketbook`
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("POCKETBOOK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".pocketbook"))
}

pub fn get_context(logger: Option<Arc<LoggingService>>) -> Result<PocketbookContext> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    PocketbookContext::new(&data_dir, logger).context("Failed to initialize pocketbook")
}
