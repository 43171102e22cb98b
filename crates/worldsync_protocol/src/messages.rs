//! Protocol messages for sync.

use crate::commit::Commit;
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// The message-type discriminator carried in every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Pull request.
    Pull,
    /// Pull response.
    PullResponse,
    /// Commit history request.
    CommitHistory,
    /// Commit history response.
    HistoryResponse,
    /// Error response.
    Error,
}

impl MessageType {
    /// Returns the wire name of this discriminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Pull => "PULL",
            MessageType::PullResponse => "PULL_RESPONSE",
            MessageType::CommitHistory => "COMMIT_HISTORY",
            MessageType::HistoryResponse => "HISTORY_RESPONSE",
            MessageType::Error => "ERROR",
        }
    }

    /// Parses a wire discriminator, returning `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "PULL" => Some(MessageType::Pull),
            "PULL_RESPONSE" => Some(MessageType::PullResponse),
            "COMMIT_HISTORY" => Some(MessageType::CommitHistory),
            "HISTORY_RESPONSE" => Some(MessageType::HistoryResponse),
            "ERROR" => Some(MessageType::Error),
            _ => None,
        }
    }
}

/// Pull request from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Branch to pull from.
    pub branch: String,
    /// Commit id the caller already has, if any.
    #[serde(rename = "sinceCommit", default, skip_serializing_if = "Option::is_none")]
    pub since_commit: Option<String>,
}

impl PullRequest {
    /// Creates a new pull request.
    pub fn new(branch: impl Into<String>, since_commit: Option<String>) -> Self {
        Self {
            branch: branch.into(),
            since_commit,
        }
    }
}

/// Pull response from the server.
///
/// `snapshot` being `None` means the caller was already current. This is
/// distinct from an empty-but-present snapshot (an initial commit with no
/// tracked files); callers decide "no updates" by comparing `new_commit_id`
/// to the id they sent, never by snapshot presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullResponse {
    /// Head commit id of the requested branch, if the branch exists.
    #[serde(rename = "newCommitId", default, skip_serializing_if = "Option::is_none")]
    pub new_commit_id: Option<String>,
    /// Snapshot bytes of the head commit, absent when already current.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Vec<u8>>,
}

impl PullResponse {
    /// Creates a response signalling the caller is already current.
    pub fn up_to_date(head: Option<String>) -> Self {
        Self {
            new_commit_id: head,
            snapshot: None,
        }
    }

    /// Creates a response carrying the head snapshot.
    pub fn with_snapshot(head: Option<String>, snapshot: Option<Vec<u8>>) -> Self {
        Self {
            new_commit_id: head,
            snapshot,
        }
    }
}

/// Commit history request from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// Branch to list.
    pub branch: String,
    /// Maximum number of commits to return.
    pub limit: u32,
}

impl HistoryRequest {
    /// Creates a new history request.
    pub fn new(branch: impl Into<String>, limit: u32) -> Self {
        Self {
            branch: branch.into(),
            limit,
        }
    }
}

/// Commit history response from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Commits ordered newest first.
    pub commits: Vec<Commit>,
}

impl HistoryResponse {
    /// Creates a new history response.
    pub fn new(commits: Vec<Commit>) -> Self {
        Self { commits }
    }
}

/// Error response from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable failure description.
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new error response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Pull request.
    PullRequest(PullRequest),
    /// Pull response.
    PullResponse(PullResponse),
    /// Commit history request.
    HistoryRequest(HistoryRequest),
    /// Commit history response.
    HistoryResponse(HistoryResponse),
    /// Error response.
    ErrorResponse(ErrorResponse),
}

#[derive(Serialize)]
struct TaggedPayload<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Deserialize)]
struct Tag {
    #[serde(rename = "type")]
    kind: String,
}

impl Message {
    /// Returns the discriminator for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::PullRequest(_) => MessageType::Pull,
            Message::PullResponse(_) => MessageType::PullResponse,
            Message::HistoryRequest(_) => MessageType::CommitHistory,
            Message::HistoryResponse(_) => MessageType::HistoryResponse,
            Message::ErrorResponse(_) => MessageType::Error,
        }
    }

    /// Encodes this message to a UTF-8 JSON payload.
    pub fn encode_payload(&self) -> ProtocolResult<Vec<u8>> {
        let kind = self.message_type().as_str();
        let bytes = match self {
            Message::PullRequest(body) => serde_json::to_vec(&TaggedPayload { kind, body })?,
            Message::PullResponse(body) => serde_json::to_vec(&TaggedPayload { kind, body })?,
            Message::HistoryRequest(body) => serde_json::to_vec(&TaggedPayload { kind, body })?,
            Message::HistoryResponse(body) => serde_json::to_vec(&TaggedPayload { kind, body })?,
            Message::ErrorResponse(body) => serde_json::to_vec(&TaggedPayload { kind, body })?,
        };
        Ok(bytes)
    }

    /// Decodes a payload, inspecting the discriminator before the shape.
    pub fn decode_payload(payload: &[u8]) -> ProtocolResult<Self> {
        let tag: Tag = serde_json::from_slice(payload)?;
        match MessageType::parse(&tag.kind) {
            Some(MessageType::Pull) => Ok(Message::PullRequest(serde_json::from_slice(payload)?)),
            Some(MessageType::PullResponse) => {
                Ok(Message::PullResponse(serde_json::from_slice(payload)?))
            }
            Some(MessageType::CommitHistory) => {
                Ok(Message::HistoryRequest(serde_json::from_slice(payload)?))
            }
            Some(MessageType::HistoryResponse) => {
                Ok(Message::HistoryResponse(serde_json::from_slice(payload)?))
            }
            Some(MessageType::Error) => {
                Ok(Message::ErrorResponse(serde_json::from_slice(payload)?))
            }
            None => Err(ProtocolError::UnknownMessageType(tag.kind)),
        }
    }
}
