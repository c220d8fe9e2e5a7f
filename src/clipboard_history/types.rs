//! Core clipboard history types

use serde::{Deserialize, Serialize};

/// Maximum characters shown in a panel row before truncation
pub const PREVIEW_MAX_CHARS: usize = 80;

/// One clipboard text item with its pin flag.
///
/// Position in the history encodes recency; there is no timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub text: String,
    #[serde(default)]
    pub pinned: bool,
}

impl Entry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pinned: false,
        }
    }

    pub fn pinned(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pinned: true,
        }
    }

    /// Display preview truncated to [`PREVIEW_MAX_CHARS`] characters.
    pub fn preview(&self) -> String {
        truncate_preview(&self.text, PREVIEW_MAX_CHARS)
    }
}

/// Truncate on a char boundary and append "..." when anything was cut.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Shapes an element of the persisted array may take.
///
/// Old history files stored bare strings; current ones store objects.
/// Both collapse into [`Entry`] right here so the ambiguity never reaches
/// the engine.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StoredEntry {
    Legacy(String),
    Current(Entry),
}

impl From<StoredEntry> for Entry {
    fn from(stored: StoredEntry) -> Self {
        match stored {
            StoredEntry::Legacy(text) => Entry::new(text),
            StoredEntry::Current(entry) => entry,
        }
    }
}
