//! Commit records.

use serde::{Deserialize, Serialize};

/// An immutable record of one accepted change.
///
/// A commit is created when a push is accepted and never modified or
/// deleted afterwards. `parent` links commits into a per-branch lineage;
/// it is `None` only for the root commit of a lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Unique commit id.
    pub id: String,
    /// Branch this commit belongs to.
    pub branch: String,
    /// Parent commit id, or `None` for a root commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Author name.
    pub author: String,
    /// Commit message.
    pub message: String,
}

impl Commit {
    /// Returns a shortened id for display.
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}
