//! Transport abstraction for client requests.

use crate::error::{SyncError, SyncResult};
use std::sync::Mutex;
use worldsync_protocol::{HistoryRequest, HistoryResponse, PullRequest, PullResponse};

/// A sync transport carries one request at a time to the server.
///
/// This trait abstracts the network layer, allowing different
/// implementations (framed TCP, in-memory for testing).
pub trait SyncTransport: Send + Sync {
    /// Sends a pull request and blocks for the correlated response.
    fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse>;

    /// Sends a history request and blocks for the correlated response.
    fn history(&self, request: &HistoryRequest) -> SyncResult<HistoryResponse>;

    /// Closes the transport connection.
    fn close(&self) -> SyncResult<()>;
}

impl<T: SyncTransport + ?Sized> SyncTransport for std::sync::Arc<T> {
    fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse> {
        (**self).pull(request)
    }

    fn history(&self, request: &HistoryRequest) -> SyncResult<HistoryResponse> {
        (**self).history(request)
    }

    fn close(&self) -> SyncResult<()> {
        (**self).close()
    }
}

/// A mock transport for testing.
#[derive(Debug, Default)]
pub struct MockTransport {
    pull_response: Mutex<Option<PullResponse>>,
    history_response: Mutex<Option<HistoryResponse>>,
}

impl MockTransport {
    /// Creates a new mock transport with no canned responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pull response.
    pub fn set_pull_response(&self, response: PullResponse) {
        *self.pull_response.lock().unwrap() = Some(response);
    }

    /// Sets the history response.
    pub fn set_history_response(&self, response: HistoryResponse) {
        *self.history_response.lock().unwrap() = Some(response);
    }
}

impl SyncTransport for MockTransport {
    fn pull(&self, _request: &PullRequest) -> SyncResult<PullResponse> {
        self.pull_response
            .lock()
            .unwrap()
            .clone()
            .ok_or(SyncError::Timeout)
    }

    fn history(&self, _request: &HistoryRequest) -> SyncResult<HistoryResponse> {
        self.history_response
            .lock()
            .unwrap()
            .clone()
            .ok_or(SyncError::Timeout)
    }

    fn close(&self) -> SyncResult<()> {
        Ok(())
    }
}
