//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

pub mod category;
mod mapping;
mod record;
pub mod result;
mod summary;
mod table;
mod user;

pub use category::{map_category, CategoryMatch};
pub use mapping::{ColumnMapping, ColumnRef, DateFormat, DateFormatHint, Field, NOT_MAPPED};
pub use record::{
    BatchFailure, CandidateRecord, DateSource, ImportOutcome, NewExpense, RowError, StoredExpense,
    ValidationErrors, DEFAULT_CATEGORY,
};
pub use summary::{CategoryTotal, DateRange, ExpenseSummary};
pub use table::{RawRow, RawTable};
pub use user::User;
