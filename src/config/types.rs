//! Configuration type definitions
//!
//! This module contains all the struct definitions for configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::*;

// ============================================
// HOTKEY CONFIG
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyConfig {
    pub modifiers: Vec<String>,
    pub key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        HotkeyConfig {
            modifiers: DEFAULT_HOTKEY_MODIFIERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            key: DEFAULT_HOTKEY_KEY.to_string(),
        }
    }
}

impl HotkeyConfig {
    /// Convert to canonical shortcut string format (e.g., "super+v").
    ///
    /// Modifiers are emitted in a fixed order (alt, ctrl, shift, super) and
    /// keys are normalized:
    /// - "KeyX" -> "x" (strip Key prefix, lowercase)
    /// - "Digit0" -> "0" (strip Digit prefix)
    /// - Other keys kept as-is but lowercased
    pub fn to_shortcut_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        let has = |names: &[&str]| {
            self.modifiers
                .iter()
                .any(|m| names.contains(&m.to_lowercase().as_str()))
        };

        if has(&["alt", "option"]) {
            parts.push("alt".to_string());
        }
        if has(&["ctrl", "control"]) {
            parts.push("ctrl".to_string());
        }
        if has(&["shift"]) {
            parts.push("shift".to_string());
        }
        if has(&["meta", "cmd", "command", "super"]) {
            parts.push("super".to_string());
        }

        let key = if let Some(rest) = self.key.strip_prefix("Key") {
            rest.to_lowercase()
        } else if let Some(rest) = self.key.strip_prefix("Digit") {
            rest.to_string()
        } else {
            self.key.to_lowercase()
        };
        parts.push(key);

        parts.join("+")
    }
}

// ============================================
// MAIN CONFIG
// ============================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Hotkey that shows the history panel (default: Super+V)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<HotkeyConfig>,
    /// History capacity before unpinned entries are evicted (default: 30)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_history: Option<usize>,
    /// Clipboard poll interval in milliseconds (default: 500)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    /// Maximum text length for history entries (bytes). 0 = no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_text_length: Option<usize>,
    /// Encrypted history file (default: ~/.clipboard_manager_data)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
    /// Symmetric key file (default: ~/.clipboard_manager_key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<String>,
    /// Consecutive failed saves before reporting a persistent failure (default: 3)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_failure_threshold: Option<u32>,
}

impl Config {
    /// Returns the panel hotkey, or Super+V if not configured
    pub fn get_hotkey(&self) -> HotkeyConfig {
        self.hotkey.clone().unwrap_or_default()
    }

    /// Returns the history capacity, never less than 1
    pub fn get_max_history(&self) -> usize {
        self.max_history.unwrap_or(DEFAULT_MAX_HISTORY).max(1)
    }

    /// Returns the monitor poll interval
    pub fn get_poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    /// Returns max clipboard text length (bytes), or default if not configured
    pub fn get_max_text_length(&self) -> usize {
        self.max_text_length.unwrap_or(DEFAULT_MAX_TEXT_LENGTH)
    }

    /// Check if text exceeds the configured limit (0 disables the check)
    pub fn is_text_over_limit(&self, text: &str) -> bool {
        let max = self.get_max_text_length();
        max > 0 && text.len() > max
    }

    /// Returns the expanded path of the encrypted history file
    pub fn get_data_path(&self) -> PathBuf {
        expand(self.data_path.as_deref().unwrap_or(DEFAULT_DATA_PATH))
    }

    /// Returns the expanded path of the key file
    pub fn get_key_path(&self) -> PathBuf {
        expand(self.key_path.as_deref().unwrap_or(DEFAULT_KEY_PATH))
    }

    pub fn get_save_failure_threshold(&self) -> u32 {
        self.save_failure_threshold
            .unwrap_or(DEFAULT_SAVE_FAILURE_THRESHOLD)
            .max(1)
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
