//! Error types for the persistence layer.
//!
//! Every fallible operation returns [`OrmError`]. Callers decide which
//! variants are fatal; the library itself never panics on bad input.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`crate::Database`] and the types it drives.
#[derive(Debug, Error)]
pub enum OrmError {
    /// The database file could not be opened or created.
    #[error("failed to open database at {}", path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Any other SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A `first` lookup matched no active row.
    #[error("record not found")]
    RecordNotFound,

    /// The model has not been persisted yet, so there is no row to target.
    #[error("{table}: primary key is not set")]
    MissingPrimaryKey { table: &'static str },

    /// A delete was requested without any condition.
    #[error("{table}: refusing to delete without a condition")]
    MissingWhereClause { table: &'static str },

    #[error("{table}: unknown column {column:?}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("column {column:?} expects {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The declared schema cannot be applied to the existing table.
    #[error("migration of {table} failed: {reason}")]
    Migration { table: String, reason: String },
}

impl OrmError {
    pub(crate) fn type_mismatch(
        column: impl Into<String>,
        expected: &'static str,
        found: &crate::Value,
    ) -> Self {
        OrmError::TypeMismatch {
            column: column.into(),
            expected,
            found: found.type_name(),
        }
    }
}
