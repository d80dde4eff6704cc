//! Log database migrations - embedded SQL files
//!
//! Applied to logs.duckdb by the same runner as the ledger schema.

/// All log migrations, in order. Format: (filename, sql_content)
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
