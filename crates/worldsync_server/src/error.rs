//! Error types for the sync server.

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Repository store failure.
    #[error("storage error: {0}")]
    Store(#[from] worldsync_store::StoreError),

    /// Wire protocol failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] worldsync_protocol::ProtocolError),

    /// I/O error on a listener or connection.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
