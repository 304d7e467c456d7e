//! Migration-specific error types.

use thiserror::Error;

/// Migration-specific errors.
///
/// Any of these raised while a table is being migrated aborts that table's
/// transaction only; the run continues with the next table.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Creating, dropping or altering a table or index failed.
    #[error("DDL failed on {table}: {source}")]
    Ddl {
        /// The table being migrated.
        table: String,
        /// The underlying database error.
        #[source]
        source: rusqlite::Error,
    },

    /// The rebuilt table does not hold as many rows as were read.
    #[error("row count mismatch rebuilding {table}: read {expected}, wrote {actual}")]
    RowCountMismatch {
        /// The table being rebuilt.
        table: String,
        /// Rows read from the old layout.
        expected: u64,
        /// Rows present after the bulk load.
        actual: u64,
    },

    /// Live metadata for a table could not be read.
    #[error("metadata for {table} is unreadable: {reason}")]
    Metadata {
        /// The table whose metadata is broken.
        table: String,
        /// What went wrong.
        reason: String,
    },

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] crate::error::Error),

    /// Database error outside any single table.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl MigrationError {
    /// Adapter for `map_err` that attributes a database error to `table`.
    pub(crate) fn ddl(table: &str) -> impl FnOnce(rusqlite::Error) -> Self + '_ {
        move |source| MigrationError::Ddl {
            table: table.to_string(),
            source,
        }
    }

    /// The table this error concerns, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            MigrationError::Ddl { table, .. }
            | MigrationError::RowCountMismatch { table, .. }
            | MigrationError::Metadata { table, .. } => Some(table),
            MigrationError::Storage(_) | MigrationError::Sqlite(_) => None,
        }
    }
}
