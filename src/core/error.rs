use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RollcallError {
    /// A uniqueness or CHECK constraint rejected the write. Lifecycle
    /// callers translate this into a domain condition ("already marked
    /// today", "open break session exists") rather than failing hard.
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Structurally valid but disallowed by a lifecycle rule; checked
    /// before any mutating statement reaches the storage layer.
    #[error("policy violation: {0}")]
    Policy(String),
    #[error("storage error: {0}")]
    Storage(rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("config error: {0}")]
    Config(String),
}

// Deliberately not #[from]: constraint failures and empty results are
// domain signals here, only the remainder is a storage fault.
impl From<rusqlite::Error> for RollcallError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, ref msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                RollcallError::Constraint(match msg {
                    Some(m) => m.clone(),
                    None => e.to_string(),
                })
            }
            rusqlite::Error::QueryReturnedNoRows => {
                RollcallError::NotFound("query returned no rows".to_string())
            }
            other => RollcallError::Storage(other),
        }
    }
}

impl RollcallError {
    /// True when the storage engine rejected a duplicate or invalid value,
    /// i.e. the caller may treat the operation as "already exists".
    pub fn is_constraint(&self) -> bool {
        matches!(self, RollcallError::Constraint(_))
    }
}
