//! Clipboard History Module
//!
//! Encrypted, bounded clipboard history with background monitoring.
//!
//! ## Features
//! - Stores plain-text entries, deduplicated by exact text
//! - Background polling every 500ms (configurable)
//! - Capacity-based eviction of the oldest unpinned entry
//! - Pin/unpin entries to protect them from eviction
//! - AES-256-GCM encryption at rest with atomic file replacement
//! - Transparent loading of the legacy bare-string history format
//!
//! ## Module Structure
//! - `types`: Core types (Entry, StoredEntry)
//! - `crypto`: Key file management, encrypt/decrypt
//! - `persistence`: Encrypted history file load/save
//! - `engine`: Shared history with dedup, eviction and pin semantics
//! - `clipboard`: System clipboard access
//! - `monitor`: Background clipboard polling

mod clipboard;
mod crypto;
mod engine;
mod monitor;
mod persistence;
mod types;

// Types
pub use types::{truncate_preview, Entry, StoredEntry, PREVIEW_MAX_CHARS};

// Crypto
pub use crypto::{decrypt, encrypt, load_or_create_key, Key, KEY_LEN};

// Persistence
pub use persistence::{parse_entries, HistoryStore};

// Engine
pub use engine::{display_order, evict_overflow, HistoryEngine};

// Clipboard access
pub use clipboard::{ClipboardAccess, SystemClipboard};

// Monitor
pub use monitor::{ClipboardMonitor, MonitorHandle, MonitorState, PollOutcome};

// Test-only exports
#[cfg(test)]
pub(crate) use clipboard::fake::FakeClipboard;
