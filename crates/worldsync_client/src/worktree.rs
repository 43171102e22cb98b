//! The tracked file set of a world directory.

use crate::error::{SyncError, SyncResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Marker file every valid world directory must contain.
pub const MARKER_FILE: &str = "level.dat";

const REGION_DIR: &str = "region";
const REGION_EXT: &str = "mca";
const METADATA_FILES: [&str; 3] = ["level.dat", "level.dat_old", "session.lock"];

/// Relative path → file contents, ordered for deterministic archiving.
pub type FileMap = BTreeMap<String, Vec<u8>>;

/// A validated world directory and its tracked file set.
///
/// Tracked are all `.mca` files under `region/` plus the fixed metadata
/// files, when present. Nothing else in the directory participates in
/// snapshots.
#[derive(Debug)]
pub struct Worktree {
    root: PathBuf,
}

impl Worktree {
    /// Opens a world directory, validating the marker file.
    pub fn open(root: impl Into<PathBuf>) -> SyncResult<Self> {
        let root = root.into();
        if !root.join(MARKER_FILE).is_file() {
            return Err(SyncError::Config(format!(
                "{} is not a world directory (missing {MARKER_FILE})",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Returns the world directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads the current tracked file set from disk.
    pub fn collect(&self) -> SyncResult<FileMap> {
        let mut files = FileMap::new();

        let region_dir = self.root.join(REGION_DIR);
        if region_dir.is_dir() {
            for entry in fs::read_dir(&region_dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(REGION_EXT)
                {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    files.insert(format!("{REGION_DIR}/{name}"), fs::read(&path)?);
                }
            }
        }

        for name in METADATA_FILES {
            let path = self.root.join(name);
            if path.is_file() {
                files.insert(name.to_string(), fs::read(&path)?);
            }
        }

        Ok(files)
    }

    /// Writes the given files into the world directory.
    ///
    /// Parent directories are created as needed. Returns the paths that
    /// were written.
    pub fn apply(&self, files: &FileMap) -> SyncResult<Vec<String>> {
        let mut updated = Vec::with_capacity(files.len());
        for (rel, bytes) in files {
            let target = self.root.join(rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, bytes)?;
            updated.push(rel.clone());
        }
        Ok(updated)
    }
}
