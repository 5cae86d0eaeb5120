//! Typed error enum for the storage layer.
//!
//! Callers match on specific failure modes (not found, duplicate) instead
//! of downcasting opaque boxes; scoped lookups that miss always surface as
//! `NotFound`, whether the row does not exist or belongs to another site.

use thiserror::Error;

/// Storage-layer error with variants covering every expected failure mode.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Row not found under the caller's scope.
    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint violation (e.g. account name taken on this site).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// SQL / connection failure.
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// Migration failure.
    #[error("migration error: {0}")]
    Migration(String),

    /// Connection mutex poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    /// Whether this error is a unique-constraint violation.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// `QueryReturnedNoRows` maps to a generic `NotFound` (callers remap with
/// entity context), constraint violations to `Duplicate`, everything else
/// to `Database`.
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::QueryReturnedNoRows => {
                Self::NotFound { entity: "row", id: "unknown".to_string() }
            },
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Duplicate(msg.clone().unwrap_or_else(|| code.to_string()))
            },
            _ => Self::Database(err),
        }
    }
}
