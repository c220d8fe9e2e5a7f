//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Maximum number of entries kept in history before unpinned eviction starts
pub const DEFAULT_MAX_HISTORY: usize = 30;

/// Interval between clipboard polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default max text length for clipboard history entries (bytes)
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 100_000;

/// Consecutive failed saves before the engine reports a persistent failure
pub const DEFAULT_SAVE_FAILURE_THRESHOLD: u32 = 3;

/// Default on-disk locations (tilde-expanded at load time)
pub const DEFAULT_DATA_PATH: &str = "~/.clipboard_manager_data";
pub const DEFAULT_KEY_PATH: &str = "~/.clipboard_manager_key";
pub const CONFIG_PATH: &str = "~/.clipboard_manager_config.json";

/// Default panel hotkey (Super+V)
pub const DEFAULT_HOTKEY_MODIFIERS: &[&str] = &["meta"];
pub const DEFAULT_HOTKEY_KEY: &str = "KeyV";
