//! Additive schema migrations for existing stores.
//!
//! Migrations are presence-checked, not version-gated: each one probes the
//! live schema (`sqlite_master`, `pragma_table_info`) and applies only what
//! is missing. There is no migration ledger; the schema itself says whether
//! a migration has run, so re-running is always a no-op.
//!
//! Fresh stores never need these. `initialize_store` creates the current
//! schema directly; migrations exist for databases created before a given
//! table or column existed.

use rusqlite::Connection;
use serde::Serialize;

use crate::core::error::RollcallError;
use crate::core::schemas;
use crate::core::store::Store;

pub struct Migration {
    pub name: &'static str,
    pub description: &'static str,
    /// True when the store is missing what this migration adds.
    pub needed: fn(&Connection) -> Result<bool, RollcallError>,
    /// Applies the change. Must be safe to call when partially applied.
    pub apply: fn(&Connection) -> Result<(), RollcallError>,
}

/// All migrations in chronological order. Each one is idempotent.
pub fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            name: "break_times",
            description: "add break_times table for break session tracking",
            needed: break_times_needed,
            apply: break_times_apply,
        },
        Migration {
            name: "user_profile_columns",
            description: "add phone/qualification/experience/job_role columns to users",
            needed: profile_columns_needed,
            apply: profile_columns_apply,
        },
    ]
}

/// Outcome of one migration pass.
#[derive(Debug, Serialize)]
pub struct MigrationReport {
    pub applied: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

impl MigrationReport {
    pub fn up_to_date(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Runs every pending migration against an existing store. Fails with
/// `NotFound` when the database file does not exist; migration never creates
/// a store.
pub fn apply_migrations(store: &Store) -> Result<MigrationReport, RollcallError> {
    store.with_existing_conn(|conn| {
        let mut report = MigrationReport {
            applied: Vec::new(),
            skipped: Vec::new(),
        };
        for migration in all_migrations() {
            if (migration.needed)(conn)? {
                (migration.apply)(conn)?;
                report.applied.push(migration.name);
            } else {
                report.skipped.push(migration.name);
            }
        }
        Ok(report)
    })
}

/// Names of migrations that would run, without applying anything.
pub fn pending_migrations(store: &Store) -> Result<Vec<&'static str>, RollcallError> {
    store.with_existing_conn(|conn| {
        let mut pending = Vec::new();
        for migration in all_migrations() {
            if (migration.needed)(conn)? {
                pending.push(migration.name);
            }
        }
        Ok(pending)
    })
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, RollcallError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, RollcallError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name=?2",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn break_times_needed(conn: &Connection) -> Result<bool, RollcallError> {
    Ok(!table_exists(conn, "break_times")?)
}

fn break_times_apply(conn: &Connection) -> Result<(), RollcallError> {
    conn.execute(schemas::SCHEMA_BREAK_TIMES, [])?;
    conn.execute(schemas::SCHEMA_INDEX_BREAK_TIMES_USER_DATE, [])?;
    Ok(())
}

const PROFILE_COLUMNS: &[(&str, &str)] = &[
    ("phone", "TEXT"),
    ("qualification", "TEXT"),
    ("experience", "TEXT"),
    ("job_role", "TEXT"),
];

fn profile_columns_needed(conn: &Connection) -> Result<bool, RollcallError> {
    for (column, _) in PROFILE_COLUMNS {
        if !column_exists(conn, "users", column)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn profile_columns_apply(conn: &Connection) -> Result<(), RollcallError> {
    // Columns are added one at a time so a store that already has some of
    // them (partial upgrade, hand-edited schema) converges cleanly.
    for (column, sql_type) in PROFILE_COLUMNS {
        if !column_exists(conn, "users", column)? {
            conn.execute(
                &format!("ALTER TABLE users ADD COLUMN {column} {sql_type}"),
                [],
            )?;
        }
    }
    Ok(())
}
