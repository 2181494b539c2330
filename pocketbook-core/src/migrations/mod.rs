//! Expense database migrations, embedded at build time
//!
//! Each entry is (file name, SQL). Entries are applied in order and recorded
//! in sys_migrations; add new files at the end with the next number.

pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_expenses.sql", include_str!("001_expenses.sql")),
];
