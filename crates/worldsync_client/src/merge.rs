//! Per-path merge of a pulled snapshot into the working copy.

use crate::worktree::FileMap;

/// Resolves the effective content for every path in the remote snapshot.
///
/// Last-writer-wins per path: a path present in the freshly recomputed
/// local change set keeps the local bytes, every other path takes the
/// remote bytes. The ancestor snapshot is decomposed alongside the other
/// two but takes no part in resolution; no conflict is ever reported.
pub fn merge_snapshots(_base: &FileMap, remote: &FileMap, local_changes: &FileMap) -> FileMap {
    let mut merged = FileMap::new();
    for (path, remote_bytes) in remote {
        let bytes = match local_changes.get(path) {
            Some(local_bytes) => local_bytes.clone(),
            None => remote_bytes.clone(),
        };
        merged.insert(path.clone(), bytes);
    }
    merged
}
