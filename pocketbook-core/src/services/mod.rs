//! Service layer
//!
//! The import pipeline stages (parse, map, normalize, validate, import) are
//! plain functions and small structs composed by `ImportSession`. The
//! remaining services wire them to configuration, storage and logging.

mod amount;
mod column_mapper;
mod date;
pub mod import;
mod importer;
pub mod logging;
pub mod migration;
mod normalize;
mod parser;
mod session;
mod session_refresh;
mod summary;
mod validator;

pub use amount::normalize_amount;
pub use column_mapper::{check_override, detect_columns};
pub use date::normalize_date;
pub use import::ImportService;
pub use importer::{BatchedImporter, ImportProgress, ProgressCallback, DEFAULT_BATCH_SIZE};
pub use logging::{EventCount, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use normalize::build_records;
pub use parser::{CsvParser, DEFAULT_MAX_FILE_BYTES};
pub use session::{ImportSession, SessionState, DEFAULT_PREVIEW_LIMIT};
pub use session_refresh::SessionRefresher;
pub use summary::SummaryService;
pub use validator::{record_errors, validate, AmountPolicy};
