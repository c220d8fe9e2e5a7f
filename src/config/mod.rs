//! Configuration module - user settings for the clipboard manager
//!
//! This module provides functionality for:
//! - Loading configuration from ~/.clipboard_manager_config.json
//! - Default values for all settings
//! - Type definitions for config structures
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions (Config, HotkeyConfig)
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

pub use defaults::{
    DEFAULT_MAX_HISTORY, DEFAULT_MAX_TEXT_LENGTH, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_SAVE_FAILURE_THRESHOLD,
};

pub use types::{Config, HotkeyConfig};

pub use loader::{load_config, load_config_from};

#[cfg(test)]
pub use defaults::{DEFAULT_DATA_PATH, DEFAULT_KEY_PATH};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
