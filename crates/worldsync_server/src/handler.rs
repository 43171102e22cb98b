//! Request dispatch against the repository store.

use crate::error::ServerResult;
use std::sync::Arc;
use worldsync_protocol::{
    ErrorResponse, HistoryRequest, HistoryResponse, Message, PullRequest, PullResponse,
};
use worldsync_store::CommitStore;

/// Handler for sync requests.
///
/// Pure dispatch: every request maps to exactly one response message, and
/// internal failures are folded into `ErrorResponse` so the connection
/// loop never has to tear down on a storage hiccup.
pub struct RequestHandler {
    store: Arc<CommitStore>,
}

impl RequestHandler {
    /// Creates a handler over an injected store.
    pub fn new(store: Arc<CommitStore>) -> Self {
        Self { store }
    }

    /// Handles one message, always producing a response.
    pub fn handle_message(&self, message: Message) -> Message {
        match message {
            Message::PullRequest(request) => self.handle_pull(request),
            Message::HistoryRequest(request) => self.handle_history(request),
            other => Message::ErrorResponse(ErrorResponse::new(format!(
                "unsupported operation: {}",
                other.message_type().as_str()
            ))),
        }
    }

    fn handle_pull(&self, request: PullRequest) -> Message {
        match self.pull(&request) {
            Ok(response) => Message::PullResponse(response),
            Err(err) => {
                tracing::warn!(branch = %request.branch, error = %err, "pull failed");
                Message::ErrorResponse(ErrorResponse::new(format!("pull failed: {err}")))
            }
        }
    }

    fn pull(&self, request: &PullRequest) -> ServerResult<PullResponse> {
        let head = self.store.head(&request.branch)?;

        // Callers decide "no updates" by id comparison, so the head id is
        // echoed back in both arms.
        if head.is_some() && head == request.since_commit {
            return Ok(PullResponse::up_to_date(head));
        }

        let snapshot = match head.as_deref() {
            Some(id) => self.store.snapshot(id)?,
            None => None,
        };
        Ok(PullResponse::with_snapshot(head, snapshot))
    }

    fn handle_history(&self, request: HistoryRequest) -> Message {
        match self.store.history(&request.branch, request.limit) {
            Ok(commits) => Message::HistoryResponse(HistoryResponse::new(commits)),
            Err(err) => {
                tracing::warn!(branch = %request.branch, error = %err, "history failed");
                Message::ErrorResponse(ErrorResponse::new(format!("history request failed: {err}")))
            }
        }
    }
}
