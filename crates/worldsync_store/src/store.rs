//! The commit/snapshot/branch store.

use crate::error::StoreResult;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;
use worldsync_protocol::Commit;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS commits (
    id        TEXT PRIMARY KEY,
    branch    TEXT NOT NULL,
    parent    TEXT,
    timestamp INTEGER NOT NULL,
    author    TEXT NOT NULL,
    message   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS snapshots (
    commit_id TEXT PRIMARY KEY,
    data      BLOB NOT NULL,
    FOREIGN KEY(commit_id) REFERENCES commits(id)
);

CREATE TABLE IF NOT EXISTS branches (
    name        TEXT PRIMARY KEY,
    head_commit TEXT NOT NULL
);
";

/// The durable repository store.
///
/// Owns its SQLite connection; writes serialize through the internal lock.
/// Commits are immutable once stored and never deleted.
pub struct CommitStore {
    conn: Mutex<Connection>,
}

impl CommitStore {
    /// Opens (or creates) a store at the given database path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory store, used by tests and tooling.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Stores a commit, its snapshot, and the branch-head advance atomically.
    ///
    /// The three writes happen in one transaction: on any failure the
    /// transaction rolls back and no partial state is visible. The last
    /// transaction to commit wins the branch head.
    pub fn save_commit(&self, commit: &Commit, snapshot: &[u8]) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO commits(id, branch, parent, timestamp, author, message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                commit.id,
                commit.branch,
                commit.parent,
                commit.timestamp,
                commit.author,
                commit.message
            ],
        )?;

        tx.execute(
            "INSERT INTO snapshots(commit_id, data) VALUES (?1, ?2)",
            params![commit.id, snapshot],
        )?;

        let updated = tx.execute(
            "UPDATE branches SET head_commit = ?1 WHERE name = ?2",
            params![commit.id, commit.branch],
        )?;
        if updated == 0 {
            tx.execute(
                "INSERT INTO branches(name, head_commit) VALUES (?1, ?2)",
                params![commit.branch, commit.id],
            )?;
        }

        tx.commit()?;
        tracing::debug!(id = %commit.id, branch = %commit.branch, "commit stored");
        Ok(())
    }

    /// Looks up a commit by id.
    pub fn commit(&self, id: &str) -> StoreResult<Option<Commit>> {
        let conn = self.conn.lock();
        let commit = conn
            .query_row(
                "SELECT id, branch, parent, timestamp, author, message
                 FROM commits WHERE id = ?1",
                params![id],
                row_to_commit,
            )
            .optional()?;
        Ok(commit)
    }

    /// Returns the raw snapshot bytes for a commit.
    pub fn snapshot(&self, commit_id: &str) -> StoreResult<Option<Vec<u8>>> {
        let conn = self.conn.lock();
        let data = conn
            .query_row(
                "SELECT data FROM snapshots WHERE commit_id = ?1",
                params![commit_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }

    /// Returns up to `limit` commits for a branch, newest first.
    ///
    /// Equal timestamps break by insertion order so the result is
    /// deterministic for a given store.
    pub fn history(&self, branch: &str, limit: u32) -> StoreResult<Vec<Commit>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, branch, parent, timestamp, author, message
             FROM commits WHERE branch = ?1
             ORDER BY timestamp DESC, rowid DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![branch, i64::from(limit)], row_to_commit)?;
        let mut commits = Vec::new();
        for row in rows {
            commits.push(row?);
        }
        Ok(commits)
    }

    /// Returns the current head commit id of a branch, if it has one.
    pub fn head(&self, branch: &str) -> StoreResult<Option<String>> {
        let conn = self.conn.lock();
        let head = conn
            .query_row(
                "SELECT head_commit FROM branches WHERE name = ?1",
                params![branch],
                |row| row.get(0),
            )
            .optional()?;
        Ok(head)
    }
}

fn row_to_commit(row: &rusqlite::Row<'_>) -> rusqlite::Result<Commit> {
    Ok(Commit {
        id: row.get(0)?,
        branch: row.get(1)?,
        parent: row.get(2)?,
        timestamp: row.get(3)?,
        author: row.get(4)?,
        message: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_commit(id: &str, branch: &str, parent: Option<&str>, timestamp: i64) -> Commit {
        Commit {
            id: id.into(),
            branch: branch.into(),
            parent: parent.map(String::from),
            timestamp,
            author: "steve".into(),
            message: format!("commit {id}"),
        }
    }

    #[test]
    fn save_and_load_commit() {
        let store = CommitStore::open_in_memory().unwrap();
        let commit = make_commit("c1", "main", None, 100);
        store.save_commit(&commit, b"snapshot-bytes").unwrap();

        assert_eq!(store.commit("c1").unwrap().unwrap(), commit);
        assert_eq!(
            store.snapshot("c1").unwrap().unwrap(),
            b"snapshot-bytes".to_vec()
        );
        assert_eq!(store.head("main").unwrap().as_deref(), Some("c1"));
    }

    #[test]
    fn missing_rows_return_none() {
        let store = CommitStore::open_in_memory().unwrap();
        assert!(store.commit("nope").unwrap().is_none());
        assert!(store.snapshot("nope").unwrap().is_none());
        assert!(store.head("never-pushed").unwrap().is_none());
    }

    #[test]
    fn head_advances_on_second_commit() {
        let store = CommitStore::open_in_memory().unwrap();
        store
            .save_commit(&make_commit("c1", "main", None, 100), b"one")
            .unwrap();
        store
            .save_commit(&make_commit("c2", "main", Some("c1"), 200), b"two")
            .unwrap();

        assert_eq!(store.head("main").unwrap().as_deref(), Some("c2"));
    }

    #[test]
    fn branches_track_separate_heads() {
        let store = CommitStore::open_in_memory().unwrap();
        store
            .save_commit(&make_commit("c1", "main", None, 100), b"one")
            .unwrap();
        store
            .save_commit(&make_commit("c2", "creative", None, 200), b"two")
            .unwrap();

        assert_eq!(store.head("main").unwrap().as_deref(), Some("c1"));
        assert_eq!(store.head("creative").unwrap().as_deref(), Some("c2"));
    }

    #[test]
    fn history_orders_newest_first_and_truncates() {
        let store = CommitStore::open_in_memory().unwrap();
        store
            .save_commit(&make_commit("c1", "main", None, 100), b"")
            .unwrap();
        store
            .save_commit(&make_commit("c2", "main", Some("c1"), 300), b"")
            .unwrap();
        store
            .save_commit(&make_commit("c3", "main", Some("c2"), 200), b"")
            .unwrap();

        let history = store.history("main", 10).unwrap();
        let ids: Vec<&str> = history.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c3", "c1"]);

        let truncated = store.history("main", 2).unwrap();
        assert_eq!(truncated.len(), 2);
        assert_eq!(truncated[0].id, "c2");
    }

    #[test]
    fn history_breaks_timestamp_ties_by_insertion_order() {
        let store = CommitStore::open_in_memory().unwrap();
        store
            .save_commit(&make_commit("c1", "main", None, 100), b"")
            .unwrap();
        store
            .save_commit(&make_commit("c2", "main", Some("c1"), 100), b"")
            .unwrap();

        let first = store.history("main", 10).unwrap();
        let second = store.history("main", 10).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].id, "c2");
    }

    #[test]
    fn history_of_unknown_branch_is_empty() {
        let store = CommitStore::open_in_memory().unwrap();
        assert!(store.history("main", 10).unwrap().is_empty());
    }

    #[test]
    fn save_commit_is_atomic_on_mid_transaction_failure() {
        let store = CommitStore::open_in_memory().unwrap();
        store
            .save_commit(&make_commit("c1", "main", None, 100), b"one")
            .unwrap();

        // Plant a snapshot row for the id about to be committed: the
        // commit insert succeeds, the snapshot insert then violates its
        // primary key mid-transaction.
        store
            .conn
            .lock()
            .execute(
                "INSERT INTO snapshots(commit_id, data) VALUES ('c2', x'00')",
                [],
            )
            .unwrap();

        let result = store.save_commit(&make_commit("c2", "main", Some("c1"), 200), b"two");
        assert!(result.is_err());

        // Nothing from the failed transaction is visible.
        assert!(store.commit("c2").unwrap().is_none());
        assert_eq!(store.head("main").unwrap().as_deref(), Some("c1"));
    }

    #[test]
    fn duplicate_commit_id_is_rejected_without_side_effects() {
        let store = CommitStore::open_in_memory().unwrap();
        store
            .save_commit(&make_commit("c1", "main", None, 100), b"one")
            .unwrap();

        let dup = make_commit("c1", "main", Some("c1"), 200);
        assert!(store.save_commit(&dup, b"two").is_err());
        assert_eq!(store.head("main").unwrap().as_deref(), Some("c1"));
        assert_eq!(store.snapshot("c1").unwrap().unwrap(), b"one".to_vec());
    }

    #[test]
    fn store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo.db");

        {
            let store = CommitStore::open(&path).unwrap();
            store
                .save_commit(&make_commit("c1", "main", None, 100), b"bytes")
                .unwrap();
        }

        let store = CommitStore::open(&path).unwrap();
        assert_eq!(store.head("main").unwrap().as_deref(), Some("c1"));
        assert_eq!(store.snapshot("c1").unwrap().unwrap(), b"bytes".to_vec());
    }

    #[test]
    fn empty_snapshot_is_stored_as_present() {
        let store = CommitStore::open_in_memory().unwrap();
        store
            .save_commit(&make_commit("c1", "main", None, 100), b"")
            .unwrap();

        let snapshot = store.snapshot("c1").unwrap();
        assert_eq!(snapshot, Some(Vec::new()));
    }
}
