//! Log database migrations, embedded at build time
//!
//! Same layout as the expense migrations; applied to logs.duckdb only.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_sys_logs.sql", include_str!("001_sys_logs.sql")),
];
