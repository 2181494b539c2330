//! Integration tests for the import pipeline
//!
//! Files go through the real parser, mapper, normalizers and validator; the
//! store is either the in-memory adapter (with failure injection) or a real
//! DuckDB database in a temp directory.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use pocketbook_core::adapters::duckdb::DuckDbExpenseStore;
use pocketbook_core::adapters::identity::StaticIdentity;
use pocketbook_core::adapters::memory::InMemoryExpenseStore;
use pocketbook_core::domain::{ColumnRef, DateSource, Field, RowError};
use pocketbook_core::services::{
    AmountPolicy, BatchedImporter, CsvParser, ImportService, ImportSession, SessionState,
};
use pocketbook_core::{Error, PocketbookContext};

// ============================================================================
// Test Helpers
// ============================================================================

fn session() -> ImportSession {
    ImportSession::new(CsvParser::default(), AmountPolicy::AllowNegative)
}

fn signed_in() -> Arc<StaticIdentity> {
    Arc::new(StaticIdentity::signed_in("user-1"))
}

/// `n` valid rows in a German-style export
fn german_csv(n: usize) -> String {
    let mut csv = String::from("Buchungstag;Betrag;Verwendungszweck\n");
    for i in 0..n {
        csv.push_str(&format!("01.03.25;-{},{:02};Karte {}\n", i + 1, i % 100, i));
    }
    csv
}

fn duckdb_store(temp_dir: &TempDir) -> Arc<DuckDbExpenseStore> {
    let store = DuckDbExpenseStore::new(&temp_dir.path().join("test.duckdb"))
        .expect("Failed to open database");
    store.ensure_schema().expect("Failed to initialize schema");
    Arc::new(store)
}

// ============================================================================
// End-to-end
// ============================================================================

/// Datum,Betrag,Text with auto-detection persists one normalized expense
#[tokio::test]
async fn test_german_export_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let store = duckdb_store(&temp_dir);

    let mut s = session();
    s.upload(b"Datum,Betrag,Text\n01.03.25,\"-45,50\",REWE Markt\n")
        .unwrap();
    assert_eq!(s.mapping().amount, ColumnRef::column("Betrag"));
    assert_eq!(s.mapping().description, ColumnRef::column("Text"));
    assert_eq!(s.mapping().date, ColumnRef::column("Datum"));

    s.preview().unwrap();
    assert!(s.errors().is_empty());

    let importer = BatchedImporter::new(store.clone(), signed_in());
    let outcome = s.import(&importer).await.unwrap();
    assert_eq!(outcome.success_count, 1);
    assert_eq!(outcome.error_count, 0);

    let stored = store.list_expenses("user-1", 10).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].amount, Decimal::new(-4550, 2));
    assert_eq!(stored[0].date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    assert_eq!(stored[0].description.as_deref(), Some("REWE Markt"));
    assert_eq!(stored[0].category, "Other");
    assert_eq!(stored[0].user_id, "user-1");
}

/// Rows with errors are reported and skipped, the rest is imported
#[tokio::test]
async fn test_mixed_file_imports_only_valid_rows() {
    let csv = "Date,Amount,Description,Category\n\
               2025-02-17,\"1,234.56\",Salary,Income\n\
               02/18/2025,(42.00),Gas station,Fuel\n\
               ,12.00,No date anywhere,\n\
               2025-02-19,,Missing amount,\n\
               not a date,5,Bad date,Coffee\n";

    let store = Arc::new(InMemoryExpenseStore::new());
    let mut s = session();
    s.upload(csv.as_bytes()).unwrap();
    s.preview().unwrap();

    assert_eq!(s.errors()[&2], vec![RowError::MissingDate]);
    assert_eq!(s.errors()[&3], vec![RowError::MissingAmount]);
    assert_eq!(s.errors()[&4], vec![RowError::InvalidDate]);
    assert_eq!(s.records()[1].category, "Transportation");

    let outcome = s
        .import(&BatchedImporter::new(store.clone(), signed_in()))
        .await
        .unwrap();
    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.validation_errors.len(), 3);

    let amounts: Vec<Decimal> = store.expenses().iter().map(|e| e.amount).collect();
    assert_eq!(amounts, vec![Decimal::new(123456, 2), Decimal::new(-4200, 2)]);
}

/// Amounts the DECIMAL(15, 2) column would round are rejected before insert
#[tokio::test]
async fn test_sub_cent_amounts_are_never_stored_rounded() {
    let temp_dir = TempDir::new().unwrap();
    let store = duckdb_store(&temp_dir);

    let csv = "Date,Amount,Description\n\
               2025-03-01,1.234,Sub cent\n\
               2025-03-02,12.50,Lunch\n\
               2025-03-03,\"0,125\",Zero led\n";
    let mut s = session();
    s.upload(csv.as_bytes()).unwrap();
    s.preview().unwrap();

    assert_eq!(s.records()[2].amount, Some(Decimal::new(125, 3)));
    assert_eq!(s.errors()[&0], vec![RowError::InvalidAmount]);
    assert_eq!(s.errors()[&2], vec![RowError::InvalidAmount]);

    let outcome = s
        .import(&BatchedImporter::new(store.clone(), signed_in()))
        .await
        .unwrap();
    assert_eq!(outcome.success_count, 1);

    let stored = store.list_expenses("user-1", 10).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].amount, Decimal::new(1250, 2));
}

// ============================================================================
// Batching
// ============================================================================

/// 120 valid records, batch size 50, second batch rejected
#[tokio::test]
async fn test_partial_failure_counts() {
    let store = Arc::new(InMemoryExpenseStore::new().fail_on_call(1));

    let mut s = session();
    s.upload(german_csv(120).as_bytes()).unwrap();
    s.preview().unwrap();
    assert!(s.errors().is_empty());

    let importer = BatchedImporter::new(store.clone(), signed_in()).with_batch_size(50);
    let outcome = s.import(&importer).await.unwrap();

    assert_eq!(outcome.success_count, 100);
    assert_eq!(outcome.error_count, 20);
    assert_eq!(outcome.failed_batches[0].batch_index, 1);
    assert_eq!(store.call_count(), 3);
    assert_eq!(s.state(), SessionState::Done);
}

/// A batch that fails inside DuckDB leaves no partial rows behind
#[tokio::test]
async fn test_duckdb_failed_batch_is_atomic() {
    let temp_dir = TempDir::new().unwrap();
    let store = duckdb_store(&temp_dir);

    let records = {
        let mut s = session();
        s.upload(german_csv(3).as_bytes()).unwrap();
        s.preview().unwrap();
        s.records().to_vec()
    };
    // Too large for DECIMAL(15, 2), so the cast fails inside the first batch
    let mut broken = records.clone();
    broken[1].amount = Some(Decimal::from_i128_with_scale(10i128.pow(20), 0));

    let outcome = BatchedImporter::new(store.clone(), signed_in())
        .with_batch_size(2)
        .import(&broken, &Default::default())
        .await
        .unwrap();

    assert_eq!(outcome.success_count, 1);
    assert_eq!(outcome.error_count, 2);
    assert_eq!(outcome.failed_batches[0].source_rows, vec![0, 1]);
    assert_eq!(store.count_expenses("user-1").unwrap(), 1);
}

// ============================================================================
// Fatal errors
// ============================================================================

#[tokio::test]
async fn test_signed_out_import_halts_before_any_insert() {
    let store = Arc::new(InMemoryExpenseStore::new());
    let mut s = session();
    s.upload(german_csv(3).as_bytes()).unwrap();
    s.preview().unwrap();

    let importer = BatchedImporter::new(store.clone(), Arc::new(StaticIdentity::signed_out()));
    let err = s.import(&importer).await.unwrap_err();

    assert!(matches!(err, Error::AuthRequired));
    assert_eq!(store.call_count(), 0);
    assert_eq!(s.state(), SessionState::Upload);
}

#[tokio::test]
async fn test_all_rows_invalid_is_fatal() {
    let store = Arc::new(InMemoryExpenseStore::new());
    let mut s = session();
    s.upload(b"Datum,Betrag\nkein datum,abc\n").unwrap();
    s.preview().unwrap();

    let err = s
        .import(&BatchedImporter::new(store.clone(), signed_in()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoValidRecords));
    assert_eq!(store.call_count(), 0);
}

// ============================================================================
// Determinism
// ============================================================================

/// The same file and mapping always give the same preview
#[test]
fn test_preview_is_idempotent() {
    let csv = "Datum;Betrag;Text;Notiz\n\
               ;-5,00;Kartenzahlung 17.02.25;\n\
               03.03.2025;12,50;Gutschrift;\n\
               ;1;Ohne Datum;2025-01-31\n";

    let run = || {
        let mut s = session();
        s.upload(csv.as_bytes()).unwrap();
        s.preview().unwrap();
        (s.records().to_vec(), s.errors().clone())
    };

    let (first_records, first_errors) = run();
    let (second_records, second_errors) = run();
    assert_eq!(first_records, second_records);
    assert_eq!(first_errors, second_errors);

    assert_eq!(first_records[0].date_source, Some(DateSource::Description));
    assert_eq!(
        first_records[2].date_source,
        Some(DateSource::Column("Notiz".to_string()))
    );
}

/// Going back to mapping and forward again with the same mapping reproduces the preview
#[test]
fn test_back_and_forth_reproduces_preview() {
    let mut s = session();
    s.upload(german_csv(5).as_bytes()).unwrap();
    s.preview().unwrap();
    let before = s.records().to_vec();

    s.back().unwrap();
    s.set_mapping(Field::Description, ColumnRef::NotMapped).unwrap();
    s.preview().unwrap();
    assert!(s.records().iter().all(|r| r.description.is_empty()));

    s.back().unwrap();
    s.set_mapping(Field::Description, ColumnRef::column("Verwendungszweck"))
        .unwrap();
    s.preview().unwrap();
    assert_eq!(s.records(), before.as_slice());
}

// ============================================================================
// Context wiring
// ============================================================================

#[tokio::test]
async fn test_context_imports_into_data_dir() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("settings.json"),
        r#"{"userId": "ctx-user", "batchSize": 2}"#,
    )
    .unwrap();

    let ctx = PocketbookContext::new(temp_dir.path(), None).unwrap();
    let service: &ImportService = &ctx.import_service;

    let mut s = service.new_session().unwrap();
    s.upload(german_csv(5).as_bytes()).unwrap();
    s.preview().unwrap();

    let outcome = s.import(&service.importer(false).unwrap()).await.unwrap();
    assert_eq!(outcome.success_count, 5);
    assert_eq!(ctx.store.count_expenses("ctx-user").unwrap(), 5);

    let summary = ctx.summary_service.get_summary().await.unwrap();
    assert_eq!(summary.total_expenses, 5);
    assert!(summary.spending < 0.0);
    assert!(temp_dir.path().join("pocketbook.duckdb").exists());
}

#[tokio::test]
async fn test_dry_run_leaves_database_untouched() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("settings.json"), r#"{"userId": "ctx-user"}"#).unwrap();

    let ctx = PocketbookContext::new(temp_dir.path(), None).unwrap();
    let mut s = ctx.import_service.new_session().unwrap();
    s.upload(german_csv(3).as_bytes()).unwrap();
    s.preview().unwrap();

    let outcome = s
        .import(&ctx.import_service.importer(true).unwrap())
        .await
        .unwrap();
    assert_eq!(outcome.success_count, 3);
    assert_eq!(ctx.store.count_expenses("ctx-user").unwrap(), 0);
}
