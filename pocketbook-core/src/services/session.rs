//! Import session - the upload, mapping, preview, import state machine

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{
    CandidateRecord, ColumnMapping, ColumnRef, DateFormatHint, Field, ImportOutcome, RawTable,
    ValidationErrors,
};

use super::column_mapper::{check_override, detect_columns};
use super::importer::BatchedImporter;
use super::logging::{LogEvent, LoggingService};
use super::normalize::build_records;
use super::parser::CsvParser;
use super::validator::{validate, AmountPolicy};

pub const DEFAULT_PREVIEW_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Upload,
    Mapping,
    Preview,
    Importing,
    Done,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Upload => "upload",
            SessionState::Mapping => "mapping",
            SessionState::Preview => "preview",
            SessionState::Importing => "importing",
            SessionState::Done => "done",
        };
        f.write_str(name)
    }
}

/// One user-driven import run
///
/// Records and validation errors only exist in Preview and later; every
/// way back to Mapping drops them, so a preview never mixes results from
/// two configurations.
pub struct ImportSession {
    state: SessionState,
    parser: CsvParser,
    policy: AmountPolicy,
    preview_limit: usize,
    table: Option<RawTable>,
    mapping: ColumnMapping,
    date_format: DateFormatHint,
    records: Vec<CandidateRecord>,
    errors: ValidationErrors,
    outcome: Option<ImportOutcome>,
    logger: Option<Arc<LoggingService>>,
}

impl ImportSession {
    pub fn new(parser: CsvParser, policy: AmountPolicy) -> Self {
        Self {
            state: SessionState::Upload,
            parser,
            policy,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            table: None,
            mapping: ColumnMapping::default(),
            date_format: DateFormatHint::Auto,
            records: Vec::new(),
            errors: ValidationErrors::new(),
            outcome: None,
            logger: None,
        }
    }

    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    pub fn with_logger(mut self, logger: Option<Arc<LoggingService>>) -> Self {
        self.logger = logger;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn table(&self) -> Option<&RawTable> {
        self.table.as_ref()
    }

    pub fn headers(&self) -> &[String] {
        self.table.as_ref().map(|t| t.headers.as_slice()).unwrap_or(&[])
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn date_format(&self) -> DateFormatHint {
        self.date_format
    }

    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn outcome(&self) -> Option<&ImportOutcome> {
        self.outcome.as_ref()
    }

    /// The first `preview_limit` records
    pub fn preview_rows(&self) -> &[CandidateRecord] {
        &self.records[..self.records.len().min(self.preview_limit)]
    }

    pub fn valid_count(&self) -> usize {
        self.records.len() - self.errors.len()
    }

    /// Parse a file and move to Mapping with a detected mapping
    ///
    /// Only allowed when no other upload is in flight (Upload or Done). A
    /// parse failure leaves the session in Upload.
    pub fn upload(&mut self, bytes: &[u8]) -> Result<&ColumnMapping> {
        self.expect_state(&[SessionState::Upload, SessionState::Done], "upload a file")?;
        self.clear();

        let table = match self.parser.parse(bytes) {
            Ok(table) => table,
            Err(e) => {
                self.log(LogEvent::new("upload_failed").with_stage("upload").with_error(e.to_string()));
                return Err(e);
            }
        };

        self.log(
            LogEvent::new("file_uploaded")
                .with_stage("upload")
                .with_row_count(table.row_count()),
        );
        self.mapping = detect_columns(&table.headers);
        self.table = Some(table);
        self.state = SessionState::Mapping;
        Ok(&self.mapping)
    }

    /// Override one field's column
    pub fn set_mapping(&mut self, field: Field, column: ColumnRef) -> Result<()> {
        self.expect_state(&[SessionState::Mapping], "change the column mapping")?;
        check_override(self.headers(), field, &column)?;
        self.mapping.set(field, column);
        Ok(())
    }

    /// Replace the whole mapping, e.g. from a saved profile
    pub fn apply_mapping(&mut self, mapping: ColumnMapping) -> Result<()> {
        self.expect_state(&[SessionState::Mapping], "change the column mapping")?;
        for field in Field::ALL {
            check_override(self.headers(), field, mapping.get(field))?;
        }
        self.mapping = mapping;
        Ok(())
    }

    pub fn set_date_format(&mut self, hint: DateFormatHint) -> Result<()> {
        self.expect_state(&[SessionState::Mapping], "change the date format")?;
        self.date_format = hint;
        Ok(())
    }

    /// Normalize and validate every row with the current configuration
    pub fn preview(&mut self) -> Result<()> {
        self.expect_state(&[SessionState::Mapping], "build a preview")?;
        if !self.mapping.has_any_mapped() {
            return Err(Error::validation(
                "Map at least one column before continuing to the preview",
            ));
        }
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| Error::invalid_state("no file has been uploaded"))?;

        self.records = build_records(table, &self.mapping, self.date_format);
        self.errors = validate(&self.records, self.policy);
        self.state = SessionState::Preview;

        self.log(
            LogEvent::new("preview_built")
                .with_stage("preview")
                .with_row_count(self.records.len()),
        );
        Ok(())
    }

    /// Step back: Preview to Mapping, or Mapping to Upload
    pub fn back(&mut self) -> Result<()> {
        match self.state {
            SessionState::Preview => {
                self.records.clear();
                self.errors.clear();
                self.state = SessionState::Mapping;
                Ok(())
            }
            SessionState::Mapping => {
                self.clear();
                Ok(())
            }
            state => Err(Error::invalid_state(format!("cannot go back from {}", state))),
        }
    }

    /// Persist the previewed records
    ///
    /// Completes with an outcome whatever the number of failed batches. A
    /// fatal error (no user, nothing valid) ends the run and returns the
    /// session to Upload; other errors return it to Preview.
    pub async fn import(&mut self, importer: &BatchedImporter) -> Result<&ImportOutcome> {
        self.expect_state(&[SessionState::Preview], "import")?;
        self.state = SessionState::Importing;

        match importer.import(&self.records, &self.errors).await {
            Ok(outcome) => {
                self.outcome = Some(outcome);
                self.state = SessionState::Done;
                self.outcome
                    .as_ref()
                    .ok_or_else(|| Error::invalid_state("import produced no outcome"))
            }
            Err(e) => {
                self.log(LogEvent::new("import_failed").with_stage("import").with_error(e.to_string()));
                if e.is_fatal() {
                    self.clear();
                } else {
                    self.state = SessionState::Preview;
                }
                Err(e)
            }
        }
    }

    /// Drop everything and start over; not allowed while importing
    pub fn reset(&mut self) -> Result<()> {
        if self.state == SessionState::Importing {
            return Err(Error::invalid_state("cannot reset while an import is running"));
        }
        self.clear();
        Ok(())
    }

    fn clear(&mut self) {
        self.state = SessionState::Upload;
        self.table = None;
        self.mapping = ColumnMapping::default();
        self.date_format = DateFormatHint::Auto;
        self.records.clear();
        self.errors.clear();
        self.outcome = None;
    }

    fn expect_state(&self, allowed: &[SessionState], action: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::invalid_state(format!(
                "cannot {} while in the {} step",
                action, self.state
            )))
        }
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event);
        }
    }
}
