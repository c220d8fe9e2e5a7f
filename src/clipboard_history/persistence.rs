//! Encrypted on-disk history
//!
//! The history is a JSON array of `{text, pinned}` objects, encrypted with
//! the user key and written atomically (temp file + rename).
//!
//! Load policy:
//! - missing file: empty history
//! - undecryptable file or a top-level value that is not a JSON array:
//!   [`LoadError`] from [`HistoryStore::load`], empty history from
//!   [`HistoryStore::load_or_empty`]
//! - unusable elements inside a valid array: skipped, the rest is kept

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use super::crypto::{self, owner_only_options, Key};
use super::types::{Entry, StoredEntry};
use crate::error::{LoadError, PersistError, ResultExt};

/// Reads and writes the encrypted history file.
///
/// Holds no history itself; every call works on a caller-provided snapshot.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    data_path: PathBuf,
    key: Key,
}

impl HistoryStore {
    pub fn new(data_path: impl Into<PathBuf>, key: Key) -> Self {
        Self {
            data_path: data_path.into(),
            key,
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.data_path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Replace the history file with `entries`.
    ///
    /// If any step fails the previous file is left untouched.
    #[instrument(name = "history_save", skip_all, fields(entry_count = entries.len()))]
    pub fn save(&self, entries: &[Entry]) -> Result<(), PersistError> {
        let json = serde_json::to_vec(entries)?;
        let blob = crypto::encrypt(&json, &self.key).map_err(|_| PersistError::Encrypt)?;

        if let Some(parent) = self.data_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| PersistError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let temp_path = self.temp_path();
        if let Err(source) = write_synced(&temp_path, &blob) {
            let _ = fs::remove_file(&temp_path);
            return Err(PersistError::Io {
                path: temp_path,
                source,
            });
        }

        // Readers see either the old blob or the new one, never a partial write
        if let Err(source) = fs::rename(&temp_path, &self.data_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(PersistError::Io {
                path: self.data_path.clone(),
                source,
            });
        }

        // The rename itself is durable only once the directory entry is synced
        sync_parent_dir(&self.data_path).warn_on_err();

        debug!(
            path = %self.data_path.display(),
            bytes = blob.len(),
            "Saved clipboard history"
        );
        Ok(())
    }

    /// Load the history. A missing file is an empty history, not an error.
    #[instrument(name = "history_load", skip_all, fields(path = %self.data_path.display()))]
    pub fn load(&self) -> Result<Vec<Entry>, LoadError> {
        let blob = match fs::read(&self.data_path) {
            Ok(blob) => blob,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("History file not found, starting fresh");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(LoadError::Io {
                    path: self.data_path.clone(),
                    source,
                })
            }
        };

        let plaintext = crypto::decrypt(&blob, &self.key)?;
        let json = String::from_utf8(plaintext)?;
        let entries = parse_entries(&json)?;

        info!(entry_count = entries.len(), "Loaded clipboard history");
        Ok(entries)
    }

    /// Load the history, logging any failure and starting fresh instead.
    pub fn load_or_empty(&self) -> Vec<Entry> {
        match self.load() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    path = %self.data_path.display(),
                    error = %e,
                    "Failed to load clipboard history, starting with empty history"
                );
                Vec::new()
            }
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = owner_only_options().create(true).truncate(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::File::open(dir)?.sync_all(),
        _ => fs::File::open(".")?.sync_all(),
    }
}

// Directory handles cannot be synced on Windows
#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Parse a decrypted history array, normalizing legacy bare strings.
///
/// Elements that match neither shape, have empty text, or repeat an earlier
/// text are dropped so the loaded sequence already satisfies the engine's
/// invariants.
pub fn parse_entries(json: &str) -> Result<Vec<Entry>, LoadError> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let total = raw.len();

    let mut entries: Vec<Entry> = Vec::with_capacity(total);
    for value in raw {
        let entry = match serde_json::from_value::<StoredEntry>(value) {
            Ok(stored) => Entry::from(stored),
            Err(e) => {
                debug!(error = %e, "Skipping unrecognized history element");
                continue;
            }
        };
        if entry.text.is_empty() || entries.iter().any(|e| e.text == entry.text) {
            continue;
        }
        entries.push(entry);
    }

    if entries.len() != total {
        warn!(
            kept = entries.len(),
            skipped = total - entries.len(),
            "Dropped unusable history elements"
        );
    }
    Ok(entries)
}
