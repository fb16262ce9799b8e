//! Store handle for the attendance database.
//!
//! A [`Store`] names the single SQLite file every subsystem reads and writes.
//! Connections are opened per operation through [`Store::with_conn`], which
//! keeps connection setup (WAL, foreign keys, busy timeout) in one place and
//! makes the scope of each connection explicit.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::core::db;
use crate::core::error::RollcallError;

/// Handle to an attendance store backed by one SQLite database file.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute or caller-relative path to the database file.
    pub db_path: PathBuf,
}

impl Store {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Store {
            db_path: db_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// True when the database file already exists on disk.
    pub fn exists(&self) -> bool {
        self.db_path.exists()
    }

    /// Opens a configured connection, runs `f`, and closes the connection.
    ///
    /// Every operation gets a fresh connection; SQLite's own locking plus the
    /// schema's uniqueness constraints are the concurrency story.
    pub fn with_conn<T, F>(&self, f: F) -> Result<T, RollcallError>
    where
        F: FnOnce(&Connection) -> Result<T, RollcallError>,
    {
        let conn = db::db_connect(&self.db_path)?;
        f(&conn)
    }

    /// Like [`Store::with_conn`] but fails with `NotFound` when the database
    /// file does not exist yet. Used by operations that must never create a
    /// store as a side effect (migration, verification, reports).
    pub fn with_existing_conn<T, F>(&self, f: F) -> Result<T, RollcallError>
    where
        F: FnOnce(&Connection) -> Result<T, RollcallError>,
    {
        if !self.exists() {
            return Err(RollcallError::NotFound(format!(
                "database not found at {}",
                self.db_path.display()
            )));
        }
        self.with_conn(f)
    }
}
