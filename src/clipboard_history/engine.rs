//! History engine
//!
//! Owns the ordered, deduplicated, pin-aware history behind a single lock.
//! Mutations copy a snapshot out while holding the lock and save it after
//! releasing it, so disk and encryption latency never block the monitor.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

use super::crypto::load_or_create_key;
use super::persistence::HistoryStore;
use super::types::Entry;
use crate::config::{Config, DEFAULT_SAVE_FAILURE_THRESHOLD};
use crate::error::{KeyIoError, PersistError};

struct HistoryState {
    entries: Vec<Entry>,
    /// Bumped on every mutation that changed `entries`
    revision: u64,
}

struct SaveState {
    saved_revision: u64,
    consecutive_failures: u32,
}

struct Persistence {
    store: HistoryStore,
    /// Serializes writers; also orders snapshots so older never overwrite newer
    save_state: Mutex<SaveState>,
    failure_threshold: u32,
    persistent_failure: AtomicBool,
}

/// Shared clipboard history. Wrap in `Arc` to hand to the monitor and the panel.
pub struct HistoryEngine {
    state: Mutex<HistoryState>,
    max_history: usize,
    persistence: Option<Persistence>,
}

impl HistoryEngine {
    /// In-memory engine with no persistence.
    pub fn new(max_history: usize) -> Self {
        Self::from_parts(max_history, Vec::new(), None)
    }

    /// Engine backed by `store`, seeded from whatever it can load.
    pub fn with_store(max_history: usize, store: HistoryStore) -> Self {
        let entries = store.load_or_empty();
        Self::from_parts(
            max_history,
            entries,
            Some(Persistence {
                store,
                save_state: Mutex::new(SaveState {
                    saved_revision: 0,
                    consecutive_failures: 0,
                }),
                failure_threshold: DEFAULT_SAVE_FAILURE_THRESHOLD,
                persistent_failure: AtomicBool::new(false),
            }),
        )
    }

    /// Set how many consecutive failed saves count as a persistent failure.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.failure_threshold = threshold.max(1);
        }
        self
    }

    /// Build the engine described by `config`: load or create the key, then
    /// load the history (empty if it cannot be read).
    ///
    /// A key file that exists but cannot be read is an error rather than a
    /// reason to generate a new key, which would orphan the existing history.
    pub fn open(config: &Config) -> Result<Self, KeyIoError> {
        let key = load_or_create_key(&config.get_key_path())?;
        let store = HistoryStore::new(config.get_data_path(), key);
        Ok(Self::with_store(config.get_max_history(), store)
            .with_failure_threshold(config.get_save_failure_threshold()))
    }

    fn from_parts(
        max_history: usize,
        mut entries: Vec<Entry>,
        persistence: Option<Persistence>,
    ) -> Self {
        let max_history = max_history.max(1);
        let evicted = evict_overflow(&mut entries, max_history);
        if evicted > 0 {
            info!(evicted, max_history, "Trimmed loaded history to capacity");
        }
        Self {
            state: Mutex::new(HistoryState {
                entries,
                revision: 0,
            }),
            max_history,
            persistence,
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Number of mutations applied since construction.
    pub fn revision(&self) -> u64 {
        self.state.lock().revision
    }

    /// Exact-match lookup (case and whitespace sensitive).
    pub fn contains(&self, text: &str) -> bool {
        self.state.lock().entries.iter().any(|e| e.text == text)
    }

    /// Copy of the history in insertion order (oldest first).
    pub fn snapshot(&self) -> Vec<Entry> {
        self.state.lock().entries.clone()
    }

    /// Append `text` unless it is empty or already present, then evict.
    ///
    /// Returns whether the history changed.
    pub fn add(&self, text: &str) -> bool {
        self.mutate(|entries, max_history| {
            if text.is_empty() || entries.iter().any(|e| e.text == text) {
                return false;
            }
            entries.push(Entry::new(text));
            // The new entry itself is never the eviction victim
            let evicted = evict_before_tail(entries, max_history, 1);
            debug!(
                text_len = text.len(),
                evicted,
                entry_count = entries.len(),
                "Added clipboard entry"
            );
            true
        })
    }

    /// Flip the pin flag of the entry with this text, keeping its position.
    ///
    /// Returns false if no such entry exists.
    pub fn toggle_pin(&self, text: &str) -> bool {
        self.mutate(|entries, _| match entries.iter_mut().find(|e| e.text == text) {
            Some(entry) => {
                entry.pinned = !entry.pinned;
                info!(pinned = entry.pinned, "Toggled clipboard entry pin");
                true
            }
            None => false,
        })
    }

    /// Delete the entry with this text whether pinned or not. Idempotent.
    pub fn remove(&self, text: &str) -> bool {
        self.mutate(|entries, _| {
            let before = entries.len();
            entries.retain(|e| e.text != text);
            let removed = entries.len() != before;
            if removed {
                info!(entry_count = entries.len(), "Removed clipboard entry");
            }
            removed
        })
    }

    /// Remove every entry, pinned ones included. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut count = 0;
        self.mutate(|entries, _| {
            count = entries.len();
            entries.clear();
            count > 0
        });
        if count > 0 {
            info!(count, "Cleared clipboard history");
        }
        count
    }

    /// Text to write back to the clipboard for the chosen entry.
    pub fn select(&self, text: &str) -> Option<String> {
        self.state
            .lock()
            .entries
            .iter()
            .find(|e| e.text == text)
            .map(|e| e.text.clone())
    }

    /// Pinned entries first, then unpinned; newest first within each group.
    pub fn list_for_display(&self) -> Vec<Entry> {
        display_order(&self.state.lock().entries)
    }

    /// Whether recent saves have kept failing (see `saveFailureThreshold`).
    pub fn persistent_save_failure(&self) -> bool {
        self.persistence
            .as_ref()
            .is_some_and(|p| p.persistent_failure.load(Ordering::Relaxed))
    }

    /// Save the current state if it is newer than what is on disk.
    ///
    /// Retries a snapshot whose automatic save failed. A no-op when the
    /// file already holds this revision or a later one.
    pub fn save_now(&self) -> Result<(), PersistError> {
        let Some(persistence) = self.persistence.as_ref() else {
            return Ok(());
        };
        let (snapshot, revision) = {
            let state = self.state.lock();
            (state.entries.clone(), state.revision)
        };
        let mut save_state = persistence.save_state.lock();
        if revision <= save_state.saved_revision {
            return Ok(());
        }
        let result = persistence.store.save(&snapshot);
        record_save_result(persistence, &mut save_state, revision, &result);
        result
    }

    /// Apply `f` under the lock; if it reports a change, persist a snapshot
    /// after the lock is released.
    fn mutate(&self, f: impl FnOnce(&mut Vec<Entry>, usize) -> bool) -> bool {
        let pending = {
            let mut state = self.state.lock();
            if !f(&mut state.entries, self.max_history) {
                return false;
            }
            state.revision += 1;
            self.persistence
                .as_ref()
                .map(|_| (state.entries.clone(), state.revision))
        };

        if let Some((snapshot, revision)) = pending {
            self.persist(snapshot, revision);
        }
        true
    }

    fn persist(&self, snapshot: Vec<Entry>, revision: u64) {
        let Some(persistence) = self.persistence.as_ref() else {
            return;
        };
        let mut save_state = persistence.save_state.lock();
        if revision <= save_state.saved_revision {
            debug!(
                revision,
                saved_revision = save_state.saved_revision,
                "Skipping stale history snapshot"
            );
            return;
        }
        let result = persistence.store.save(&snapshot);
        record_save_result(persistence, &mut save_state, revision, &result);
    }
}

fn record_save_result(
    persistence: &Persistence,
    save_state: &mut SaveState,
    revision: u64,
    result: &Result<(), PersistError>,
) {
    match result {
        Ok(()) => {
            save_state.saved_revision = save_state.saved_revision.max(revision);
            save_state.consecutive_failures = 0;
            if persistence.persistent_failure.swap(false, Ordering::Relaxed) {
                info!("Clipboard history saves recovered");
            }
        }
        Err(e) => {
            save_state.consecutive_failures += 1;
            warn!(
                error = %e,
                consecutive_failures = save_state.consecutive_failures,
                "Failed to save clipboard history"
            );
            if save_state.consecutive_failures == persistence.failure_threshold {
                persistence.persistent_failure.store(true, Ordering::Relaxed);
                error!(
                    path = %persistence.store.data_path().display(),
                    consecutive_failures = save_state.consecutive_failures,
                    "Clipboard history is not being saved; recent entries may be lost"
                );
            }
        }
    }
}

/// Drop the oldest unpinned entries until within `max_history`.
///
/// Stops early when only pinned entries remain, leaving the history over
/// capacity. Returns the number of entries evicted.
pub fn evict_overflow(entries: &mut Vec<Entry>, max_history: usize) -> usize {
    evict_before_tail(entries, max_history, 0)
}

/// Eviction that only considers entries before the last `protected_tail`.
fn evict_before_tail(entries: &mut Vec<Entry>, max_history: usize, protected_tail: usize) -> usize {
    let mut evicted = 0;
    while entries.len() > max_history {
        let searchable = entries.len().saturating_sub(protected_tail);
        match entries[..searchable].iter().position(|e| !e.pinned) {
            Some(idx) => {
                entries.remove(idx);
                evicted += 1;
            }
            None => break,
        }
    }
    evicted
}

/// Stable partition by pin status, each partition newest first.
pub fn display_order(entries: &[Entry]) -> Vec<Entry> {
    let pinned = entries.iter().rev().filter(|e| e.pinned);
    let unpinned = entries.iter().rev().filter(|e| !e.pinned);
    pinned.chain(unpinned).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard_history::crypto::Key;
    use std::sync::Arc;
    use std::thread;

    fn texts(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn test_add_appends_and_reports_change() {
        let engine = HistoryEngine::new(30);
        assert!(engine.add("a"));
        assert!(engine.add("b"));
        assert_eq!(texts(&engine.snapshot()), vec!["a", "b"]);
        assert_eq!(engine.revision(), 2);
    }

    #[test]
    fn test_add_is_idempotent() {
        let engine = HistoryEngine::new(30);
        assert!(engine.add("x"));
        assert!(engine.contains("x"));
        assert!(!engine.add("x"));
        assert!(engine.contains("x"));
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.revision(), 1);
    }

    #[test]
    fn test_add_empty_is_noop() {
        let engine = HistoryEngine::new(30);
        assert!(!engine.add(""));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_contains_is_exact_match() {
        let engine = HistoryEngine::new(30);
        engine.add("Hello");
        assert!(!engine.contains("hello"));
        assert!(!engine.contains("Hello "));
        assert!(engine.add("Hello "));
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_cap_holds_after_every_add() {
        let engine = HistoryEngine::new(5);
        for i in 0..40 {
            engine.add(&format!("entry {}", i));
            assert!(engine.len() <= 5);
        }
        assert_eq!(
            texts(&engine.snapshot()),
            vec!["entry 35", "entry 36", "entry 37", "entry 38", "entry 39"]
        );
    }

    #[test]
    fn test_eviction_removes_oldest_unpinned() {
        let engine = HistoryEngine::new(2);
        engine.add("A");
        engine.add("B");
        engine.add("C");
        // A was evicted when C arrived
        assert_eq!(texts(&engine.snapshot()), vec!["B", "C"]);

        let engine = HistoryEngine::new(3);
        for t in ["A", "B", "C", "D"] {
            engine.add(t);
        }
        assert_eq!(texts(&engine.snapshot()), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_eviction_skips_pinned_entries() {
        let engine = HistoryEngine::new(3);
        engine.add("A");
        engine.add("B");
        engine.add("C");
        engine.toggle_pin("A");

        engine.add("D");
        assert_eq!(texts(&engine.snapshot()), vec!["A", "C", "D"]);
    }

    #[test]
    fn test_all_pinned_exceeds_capacity() {
        let engine = HistoryEngine::new(3);
        for t in ["A", "B", "C"] {
            engine.add(t);
            engine.toggle_pin(t);
        }

        assert!(engine.add("D"));
        assert_eq!(engine.len(), 4);
        assert_eq!(texts(&engine.snapshot()), vec!["A", "B", "C", "D"]);

        // The next unpinned arrival evicts the earlier unpinned one
        assert!(engine.add("E"));
        assert_eq!(texts(&engine.snapshot()), vec!["A", "B", "C", "E"]);
    }

    #[test]
    fn test_new_entry_survives_when_older_entries_are_pinned() {
        let engine = HistoryEngine::new(1);
        engine.add("A");
        engine.toggle_pin("A");

        assert!(engine.add("B"));
        assert!(engine.contains("B"));
        assert_eq!(texts(&engine.snapshot()), vec!["A", "B"]);

        assert!(engine.add("C"));
        assert_eq!(texts(&engine.snapshot()), vec!["A", "C"]);
    }

    #[test]
    fn test_evict_overflow_may_remove_last_entry_on_load() {
        let mut entries = vec![Entry::pinned("A"), Entry::new("B")];
        assert_eq!(evict_overflow(&mut entries, 1), 1);
        assert_eq!(texts(&entries), vec!["A"]);
    }

    #[test]
    fn test_toggle_pin_keeps_position() {
        let engine = HistoryEngine::new(30);
        engine.add("a");
        engine.add("b");
        engine.add("c");

        assert!(engine.toggle_pin("b"));
        let snapshot = engine.snapshot();
        assert_eq!(texts(&snapshot), vec!["a", "b", "c"]);
        assert!(snapshot[1].pinned);

        assert!(engine.toggle_pin("b"));
        assert!(!engine.snapshot()[1].pinned);
    }

    #[test]
    fn test_toggle_pin_missing_entry() {
        let engine = HistoryEngine::new(30);
        assert!(!engine.toggle_pin("ghost"));
        assert_eq!(engine.revision(), 0);
    }

    #[test]
    fn test_remove_ignores_pin_and_is_idempotent() {
        let engine = HistoryEngine::new(30);
        engine.add("a");
        engine.toggle_pin("a");

        assert!(engine.remove("a"));
        assert!(!engine.contains("a"));
        assert!(!engine.remove("a"));
    }

    #[test]
    fn test_clear_removes_everything() {
        let engine = HistoryEngine::new(30);
        engine.add("a");
        engine.add("b");
        engine.toggle_pin("a");

        assert_eq!(engine.clear(), 2);
        assert!(engine.is_empty());
        assert_eq!(engine.clear(), 0);
    }

    #[test]
    fn test_select_returns_text() {
        let engine = HistoryEngine::new(30);
        engine.add("copy me");
        assert_eq!(engine.select("copy me"), Some("copy me".to_string()));
        assert_eq!(engine.select("missing"), None);
    }

    #[test]
    fn test_display_order_pinned_first_newest_first() {
        let engine = HistoryEngine::new(30);
        engine.add("A");
        engine.add("B");
        engine.add("C");
        engine.toggle_pin("B");

        assert_eq!(texts(&engine.list_for_display()), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_display_order_multiple_pins() {
        let entries = vec![
            Entry::pinned("p1"),
            Entry::new("u1"),
            Entry::pinned("p2"),
            Entry::new("u2"),
        ];
        assert_eq!(
            texts(&display_order(&entries)),
            vec!["p2", "p1", "u2", "u1"]
        );
    }

    #[test]
    fn test_evict_overflow_counts() {
        let mut entries = vec![
            Entry::new("a"),
            Entry::pinned("b"),
            Entry::new("c"),
            Entry::new("d"),
        ];
        assert_eq!(evict_overflow(&mut entries, 2), 2);
        assert_eq!(texts(&entries), vec!["b", "d"]);
    }

    #[test]
    fn test_concurrent_adds_keep_invariants() {
        let engine = Arc::new(HistoryEngine::new(10));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for i in 0..50 {
                        engine.add(&format!("{}-{}", t, i % 25));
                        let _ = engine.list_for_display();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = engine.snapshot();
        assert!(snapshot.len() <= 10);
        let mut unique: Vec<_> = texts(&snapshot);
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), snapshot.len());
    }

    #[test]
    fn test_mutations_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let key = Key::generate();

        let engine = HistoryEngine::with_store(30, HistoryStore::new(&path, key.clone()));
        engine.add("one");
        engine.add("two");
        engine.toggle_pin("one");
        engine.remove("two");

        let reloaded = HistoryStore::new(&path, key).load().unwrap();
        assert_eq!(reloaded, vec![Entry::pinned("one")]);
    }

    #[test]
    fn test_with_store_loads_and_trims_to_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history"), Key::generate());
        store
            .save(&[
                Entry::new("a"),
                Entry::pinned("b"),
                Entry::new("c"),
                Entry::new("d"),
            ])
            .unwrap();

        let engine = HistoryEngine::with_store(2, store);
        assert_eq!(texts(&engine.snapshot()), vec!["b", "d"]);
    }

    #[test]
    fn test_stale_snapshot_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let key = Key::generate();
        let engine = HistoryEngine::with_store(30, HistoryStore::new(&path, key.clone()));

        engine.add("first");
        engine.add("second");
        // An older snapshot arriving late must not clobber the newer file
        engine.persist(vec![Entry::new("first")], 1);

        let reloaded = HistoryStore::new(&path, key).load().unwrap();
        assert_eq!(texts(&reloaded), vec!["first", "second"]);
    }

    #[test]
    fn test_repeated_save_failures_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        // A directory at the temp path makes every save fail
        std::fs::create_dir(dir.path().join("history.tmp")).unwrap();

        let engine = HistoryEngine::with_store(30, HistoryStore::new(&path, Key::generate()))
            .with_failure_threshold(2);

        engine.add("a");
        assert!(!engine.persistent_save_failure());
        engine.add("b");
        assert!(engine.persistent_save_failure());
        // The in-memory history is unaffected
        assert_eq!(engine.len(), 2);

        std::fs::remove_dir(dir.path().join("history.tmp")).unwrap();
        engine.add("c");
        assert!(!engine.persistent_save_failure());
    }

    #[test]
    fn test_in_memory_engine_never_reports_failure() {
        let engine = HistoryEngine::new(30);
        engine.add("a");
        assert!(!engine.persistent_save_failure());
        assert!(engine.save_now().is_ok());
    }

    #[test]
    fn test_save_now_without_changes_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        // Unreadable under this key, so the engine starts empty
        std::fs::write(&path, b"not ours").unwrap();

        let engine = HistoryEngine::with_store(30, HistoryStore::new(&path, Key::generate()));
        assert!(engine.is_empty());
        engine.save_now().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"not ours");
    }

    #[test]
    fn test_save_now_retries_failed_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let key = Key::generate();
        std::fs::create_dir(dir.path().join("history.tmp")).unwrap();

        let engine = HistoryEngine::with_store(30, HistoryStore::new(&path, key.clone()));
        engine.add("pending");
        assert!(engine.save_now().is_err());
        assert!(!path.exists());

        std::fs::remove_dir(dir.path().join("history.tmp")).unwrap();
        engine.save_now().unwrap();
        let reloaded = HistoryStore::new(&path, key).load().unwrap();
        assert_eq!(texts(&reloaded), vec!["pending"]);
    }

    #[test]
    fn test_open_uses_config_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_path: Some(dir.path().join("data").to_string_lossy().into_owned()),
            key_path: Some(dir.path().join("key").to_string_lossy().into_owned()),
            max_history: Some(4),
            ..Default::default()
        };

        let engine = HistoryEngine::open(&config).unwrap();
        assert_eq!(engine.max_history(), 4);
        engine.add("persist me");
        assert!(dir.path().join("key").exists());
        assert!(dir.path().join("data").exists());

        let reopened = HistoryEngine::open(&config).unwrap();
        assert!(reopened.contains("persist me"));
    }

    #[test]
    fn test_open_fails_on_malformed_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("key"), "garbage").unwrap();
        let config = Config {
            data_path: Some(dir.path().join("data").to_string_lossy().into_owned()),
            key_path: Some(dir.path().join("key").to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert!(matches!(
            HistoryEngine::open(&config),
            Err(KeyIoError::Malformed { .. })
        ));
    }
}
