//! Error types for the repository store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the repository store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error, including any failure inside the commit transaction.
    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error while opening the database.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
