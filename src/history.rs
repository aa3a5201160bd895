//! Durable, capped query/answer history.
//!
//! The log lives in one key-value slot abstracted by [`KeyValueSlot`]:
//! a single serialized payload with `get`/`set`/`delete`. Any embedded or
//! file-backed store satisfies the contract; [`FileSlot`] is the default,
//! writing through a temp file and rename so readers never observe a
//! partial payload.
//!
//! Invariants: newest entry first, at most [`HISTORY_CAP`] entries, oldest
//! evicted first. A missing or corrupt payload reads as an empty log and
//! is never fatal.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

use crate::models::HistoryEntry;

/// Maximum number of retained history entries.
pub const HISTORY_CAP: usize = 50;

/// A single durable slot holding one serialized payload.
pub trait KeyValueSlot: Send + Sync {
    /// Read the payload, or `None` if the slot has never been written.
    fn get(&self) -> Result<Option<String>>;
    /// Replace the payload. Must not expose partial writes to readers.
    fn set(&self, payload: &str) -> Result<()>;
    /// Remove the payload entirely.
    fn delete(&self) -> Result<()>;
}

/// File-backed [`KeyValueSlot`].
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl KeyValueSlot for FileSlot {
    fn get(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    fn set(&self, payload: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        // Write-then-rename keeps the old payload visible until the new
        // one is complete.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, payload)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

/// Persisted history log with FIFO eviction at [`HISTORY_CAP`].
///
/// `append` is read-modify-write over the full log, so a mutex serializes
/// writers; `load` never fails.
pub struct HistoryStore {
    slot: Box<dyn KeyValueSlot>,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(slot: Box<dyn KeyValueSlot>) -> Self {
        Self {
            slot,
            write_lock: Mutex::new(()),
        }
    }

    /// Open a file-backed store at the given path.
    pub fn open(path: PathBuf) -> Self {
        Self::new(Box::new(FileSlot::new(path)))
    }

    /// Load the persisted log, newest first. Missing or unreadable
    /// payloads yield an empty log.
    pub fn load(&self) -> Vec<HistoryEntry> {
        let payload = match self.slot.get() {
            Ok(Some(payload)) => payload,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("history slot unreadable, starting empty: {e:#}");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<HistoryEntry>>(&payload) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("history payload corrupt, starting empty: {e}");
                Vec::new()
            }
        }
    }

    /// Prepend an entry, evict past the cap, and persist before returning.
    pub fn append(&self, entry: HistoryEntry) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();

        let mut entries = self.load();
        entries.insert(0, entry);
        entries.truncate(HISTORY_CAP);

        let payload = serde_json::to_string(&entries)?;
        self.slot.set(&payload)
    }

    /// Empty the log and remove the persisted payload.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        self.slot.delete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn entry(n: usize) -> HistoryEntry {
        HistoryEntry {
            question: format!("question {n}"),
            answer: format!("answer {n}"),
            submitted_at: Utc::now(),
        }
    }

    fn store_in(dir: &TempDir) -> HistoryStore {
        HistoryStore::open(dir.path().join("history.json"))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load().is_empty());
    }

    #[test]
    fn test_append_prepends_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.append(entry(1)).unwrap();
        store.append(entry(2)).unwrap();

        let log = store.load();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].question, "question 2");
        assert_eq!(log[1].question, "question 1");
    }

    #[test]
    fn test_cap_evicts_oldest_first() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for n in 0..HISTORY_CAP + 5 {
            store.append(entry(n)).unwrap();
        }

        let log = store.load();
        assert_eq!(log.len(), HISTORY_CAP);
        // Newest entry at the front, the five oldest evicted.
        assert_eq!(log[0].question, format!("question {}", HISTORY_CAP + 4));
        assert_eq!(log[HISTORY_CAP - 1].question, "question 5");
    }

    #[test]
    fn test_corrupt_payload_reads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = HistoryStore::open(path);
        assert!(store.load().is_empty());

        // A corrupt slot must still accept new appends.
        store.append(entry(1)).unwrap();
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn test_clear_removes_payload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let store = HistoryStore::open(path.clone());
        store.append(entry(1)).unwrap();
        store.clear().unwrap();

        assert!(store.load().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        HistoryStore::open(path.clone()).append(entry(7)).unwrap();

        let reopened = HistoryStore::open(path);
        assert_eq!(reopened.load()[0].answer, "answer 7");
    }
}
