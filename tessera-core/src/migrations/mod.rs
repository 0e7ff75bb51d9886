//! Database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary at build time using include_str!.
//! Each migration is a tuple of (name, sql_content), applied in list order.

/// All migrations, embedded at compile time.
/// Format: (filename, sql_content)
///
/// New migrations go at the end as NNN_description.sql; applied ones are
/// never edited.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
    ("002_credit_packages.sql", include_str!("002_credit_packages.sql")),
    ("003_usage_tracking.sql", include_str!("003_usage_tracking.sql")),
];

/// Name of the bootstrap migration that creates `sys_migrations`
pub const BOOTSTRAP_MIGRATION: &str = "000_migrations.sql";
