//! Error types for the sync client.

use thiserror::Error;

/// Result type for client operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The working directory is not a world save.
    #[error("invalid world directory: {0}")]
    Config(String),

    /// Local sync state conflict, such as re-initializing.
    #[error("state error: {0}")]
    State(String),

    /// No response arrived within the request timeout.
    #[error("no response from server within the timeout")]
    Timeout,

    /// Connection-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with an error message.
    #[error("server error: {0}")]
    Server(String),

    /// The response did not match the request.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Wire protocol failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] worldsync_protocol::ProtocolError),

    /// Repository store failure.
    #[error("storage error: {0}")]
    Store(#[from] worldsync_store::StoreError),

    /// Snapshot archive failure.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Working-directory I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
