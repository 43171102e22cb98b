//! Local sync state persisted beside the working directory.

use crate::error::{SyncError, SyncResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the sync state record inside the world directory.
pub const STATE_FILE_NAME: &str = ".worldsync_state";

const COMMIT_ID_KEY: &str = "commitId";

/// The client's record of which commit the working directory reflects.
///
/// A one-key `commitId=` file, read once at startup and rewritten only
/// after a push or pull has fully succeeded.
#[derive(Debug)]
pub struct LocalState {
    path: PathBuf,
    current: Option<String>,
}

impl LocalState {
    /// Loads the state beside the given world directory.
    ///
    /// A missing file is not an error; it means the repository has not
    /// been initialized or pushed to yet.
    pub fn load(world_dir: &Path) -> SyncResult<Self> {
        let path = world_dir.join(STATE_FILE_NAME);
        let current = match fs::read_to_string(&path) {
            Ok(contents) => parse_state(&contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, current })
    }

    /// Returns true if the state file exists on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Creates the state file for a fresh repository.
    ///
    /// Fails with a state error if the file already exists; the existing
    /// state is left untouched. The fresh state carries no commit id, so
    /// the first push gets a root commit.
    pub fn initialize(&mut self) -> SyncResult<()> {
        if self.path.exists() {
            return Err(SyncError::State(format!(
                "repository already initialized ({} exists)",
                self.path.display()
            )));
        }
        self.current = None;
        self.write()
    }

    /// Returns the commit id the working directory currently reflects.
    pub fn current_commit_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Records a new current commit id, persisting before updating memory.
    pub fn advance(&mut self, commit_id: Option<String>) -> SyncResult<()> {
        let previous = std::mem::replace(&mut self.current, commit_id);
        if let Err(err) = self.write() {
            self.current = previous;
            return Err(err);
        }
        Ok(())
    }

    fn write(&self) -> SyncResult<()> {
        let line = format!(
            "{COMMIT_ID_KEY}={}\n",
            self.current.as_deref().unwrap_or_default()
        );
        fs::write(&self.path, line)?;
        Ok(())
    }
}

fn parse_state(contents: &str) -> Option<String> {
    contents
        .lines()
        .find_map(|line| line.trim().strip_prefix(COMMIT_ID_KEY))
        .and_then(|rest| rest.strip_prefix('='))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
}
