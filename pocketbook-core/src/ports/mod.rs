//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The import
//! pipeline depends only on these traits, not on concrete implementations.

mod expense_store;
mod identity;

pub use expense_store::ExpenseStore;
pub use identity::IdentityProvider;
