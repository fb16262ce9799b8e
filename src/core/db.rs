use std::fs;
use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::core::error::RollcallError;
use crate::core::schemas;
use crate::core::store::Store;
use crate::ops::users;

/// Opens a connection with the settings every caller relies on: WAL for
/// readers during writes, foreign keys enforced, and a busy timeout so a
/// second process waits instead of failing immediately.
pub fn db_connect(db_path: &Path) -> Result<Connection, RollcallError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    Ok(conn)
}

/// Creates the full current schema and the seed rows. Safe to run against an
/// existing store: every DDL statement is `IF NOT EXISTS` and every seed is
/// `INSERT OR IGNORE`, so repeated runs change nothing.
pub fn initialize_store(store: &Store) -> Result<(), RollcallError> {
    if let Some(parent) = store.path().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    store.with_conn(|conn| {
        ensure_schema(conn)?;
        seed_defaults(conn)
    })
}

fn ensure_schema(conn: &Connection) -> Result<(), RollcallError> {
    conn.execute(schemas::SCHEMA_ROLES, [])?;
    conn.execute(schemas::SCHEMA_USERS, [])?;
    conn.execute(schemas::SCHEMA_ATTENDANCE, [])?;
    conn.execute(schemas::SCHEMA_BREAK_TIMES, [])?;
    conn.execute(schemas::SCHEMA_LEAVE_REQUESTS, [])?;
    conn.execute(schemas::SCHEMA_HOLIDAYS, [])?;
    conn.execute(schemas::SCHEMA_INDEX_ATTENDANCE_DATE, [])?;
    conn.execute(schemas::SCHEMA_INDEX_BREAK_TIMES_USER_DATE, [])?;
    conn.execute(schemas::SCHEMA_INDEX_LEAVE_STATUS, [])?;
    Ok(())
}

fn seed_defaults(conn: &Connection) -> Result<(), RollcallError> {
    conn.execute(schemas::SEED_ROLE_ADMIN, [])?;
    conn.execute(schemas::SEED_ROLE_EMPLOYEE, [])?;

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO users (username, password, full_name, email, role_id)
         VALUES (?1, ?2, ?3, ?4, (SELECT role_id FROM roles WHERE role_name = ?5))",
    )?;
    for (username, password, full_name, email, role_name) in schemas::SEED_USERS {
        stmt.execute(rusqlite::params![
            username,
            users::hash_password(password),
            full_name,
            email,
            role_name,
        ])?;
    }
    Ok(())
}
