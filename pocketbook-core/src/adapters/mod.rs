//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the ExpenseStore port
//! - An in-memory ExpenseStore for dry runs and tests
//! - A configuration-backed IdentityProvider

pub mod duckdb;
pub mod identity;
pub mod memory;
