//! The client sync engine.

use crate::config::ClientConfig;
use crate::error::SyncResult;
use crate::merge::merge_snapshots;
use crate::snapshot;
use crate::state::LocalState;
use crate::transport::SyncTransport;
use crate::worktree::{FileMap, Worktree};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;
use worldsync_protocol::{Commit, HistoryRequest, PullRequest};
use worldsync_store::CommitStore;

/// The state of a logical client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No operation in flight.
    Idle,
    /// Establishing the connection for a request.
    Connecting,
    /// A request is in flight, waiting for its correlated response.
    AwaitingResponse,
}

impl SessionState {
    /// Returns true if an operation is in flight.
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }
}

/// Result of a pull operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The working directory already reflects the branch head.
    UpToDate,
    /// A newer snapshot was merged into the working directory.
    Applied {
        /// The branch head the local state advanced to.
        new_head: Option<String>,
        /// Paths written into the working directory.
        updated_files: Vec<String>,
    },
}

/// The sync engine for one world directory.
///
/// Operations take `&mut self`, which serializes them: a second request
/// cannot start before the first resolves. Push is purely local and never
/// touches the transport.
pub struct SyncService<T: SyncTransport> {
    config: ClientConfig,
    worktree: Worktree,
    state: LocalState,
    store: Arc<CommitStore>,
    transport: T,
    session: SessionState,
}

impl<T: SyncTransport> SyncService<T> {
    /// Creates a service over a validated world directory.
    pub fn new(
        config: ClientConfig,
        world_dir: impl Into<PathBuf>,
        store: Arc<CommitStore>,
        transport: T,
    ) -> SyncResult<Self> {
        let worktree = Worktree::open(world_dir)?;
        let state = LocalState::load(worktree.root())?;
        Ok(Self {
            config,
            worktree,
            state,
            store,
            transport,
            session: SessionState::Idle,
        })
    }

    /// Returns the current session state.
    pub fn session(&self) -> SessionState {
        self.session
    }

    /// Returns the branch this service syncs.
    pub fn branch(&self) -> &str {
        &self.config.branch
    }

    /// Returns the commit id the working directory currently reflects.
    pub fn current_commit_id(&self) -> Option<&str> {
        self.state.current_commit_id()
    }

    /// Initializes a fresh repository state for this world directory.
    ///
    /// Fails with a state error if already initialized.
    pub fn init(&mut self) -> SyncResult<()> {
        self.state.initialize()?;
        tracing::info!(world = %self.worktree.root().display(), "repository initialized");
        Ok(())
    }

    /// Records the current tracked file set as a new commit.
    ///
    /// The snapshot and commit go straight into the local repository
    /// store; local state advances only once the store write succeeded.
    /// Returns the new commit id.
    pub fn push(&mut self, message: &str, author: &str) -> SyncResult<String> {
        let files = self.worktree.collect()?;
        let archive = snapshot::pack(&files)?;

        let commit = Commit {
            id: Uuid::new_v4().to_string(),
            branch: self.config.branch.clone(),
            parent: self.state.current_commit_id().map(String::from),
            timestamp: epoch_millis(),
            author: author.into(),
            message: message.into(),
        };

        self.store.save_commit(&commit, &archive)?;
        self.state.advance(Some(commit.id.clone()))?;

        tracing::info!(id = %commit.id, files = files.len(), "pushed commit");
        Ok(commit.id)
    }

    /// Fetches the branch head and merges it into the working directory.
    pub fn pull(&mut self) -> SyncResult<PullOutcome> {
        self.session = SessionState::Connecting;
        let result = self.pull_inner();
        self.session = SessionState::Idle;
        result
    }

    fn pull_inner(&mut self) -> SyncResult<PullOutcome> {
        let request = PullRequest::new(
            self.config.branch.clone(),
            self.state.current_commit_id().map(String::from),
        );
        self.session = SessionState::AwaitingResponse;
        let response = self.transport.pull(&request)?;

        // "No updates" means the returned id matches what we sent, never
        // that the snapshot is absent; an initial commit can legitimately
        // carry an empty snapshot.
        if response.new_commit_id.as_deref() == self.state.current_commit_id() {
            return Ok(PullOutcome::UpToDate);
        }

        let local_changes = self.worktree.collect()?;
        let base = self.load_base_snapshot()?;
        let remote = match response.snapshot.as_deref() {
            Some(bytes) => snapshot::unpack(bytes)?,
            None => FileMap::new(),
        };

        let merged = merge_snapshots(&base, &remote, &local_changes);
        let updated_files = self.worktree.apply(&merged)?;
        self.state.advance(response.new_commit_id.clone())?;

        tracing::info!(
            head = response.new_commit_id.as_deref().unwrap_or("none"),
            files = updated_files.len(),
            "pull applied"
        );
        Ok(PullOutcome::Applied {
            new_head: response.new_commit_id,
            updated_files,
        })
    }

    /// Returns up to `limit` commits of branch history, newest first.
    pub fn history(&mut self, limit: u32) -> SyncResult<Vec<Commit>> {
        self.session = SessionState::Connecting;
        let request = HistoryRequest::new(self.config.branch.clone(), limit);
        self.session = SessionState::AwaitingResponse;
        let result = self.transport.history(&request);
        self.session = SessionState::Idle;
        Ok(result?.commits)
    }

    fn load_base_snapshot(&self) -> SyncResult<FileMap> {
        let Some(id) = self.state.current_commit_id() else {
            return Ok(FileMap::new());
        };
        match self.store.snapshot(id)? {
            Some(bytes) => snapshot::unpack(&bytes),
            None => Ok(FileMap::new()),
        }
    }
}

fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
