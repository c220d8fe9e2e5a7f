//! Error taxonomy for the clipboard history core.
//!
//! Each layer has its own error type so callers can tell a wrong key apart
//! from a full disk. Background loops never propagate these; they log and
//! carry on via [`ResultExt`].

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, warn};

/// Failures reading or creating the symmetric key file.
#[derive(Error, Debug)]
pub enum KeyIoError {
    #[error("Failed to read key file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write key file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key file '{path}' is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Authenticated decryption failed. Never an I/O problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptError {
    #[error("Ciphertext is truncated ({len} bytes)")]
    Truncated { len: usize },

    #[error("Unsupported ciphertext version {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("Authentication failed (wrong key or tampered data)")]
    Authentication,
}

/// Failures while saving the history.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to encrypt history")]
    Encrypt,

    #[error("Failed to write history to '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while loading the history. All of them are recoverable to an
/// empty history.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read history file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decrypt history: {0}")]
    Decrypt(#[from] DecryptError),

    #[error("History is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("History is not a JSON array: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The platform clipboard could not be reached.
#[derive(Error, Debug)]
pub enum ClipboardAccessError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to write clipboard: {0}")]
    Write(String),
}

/// The panel hotkey could not be parsed or registered.
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Unknown hotkey modifier '{0}'. Valid modifiers: meta, cmd, super, ctrl, alt, option, shift")]
    UnknownModifier(String),

    #[error("Unknown key code '{0}'. Use names like KeyV, Digit1, F5, Space")]
    UnknownKey(String),

    #[error("Failed to register hotkey '{shortcut}': {reason}")]
    Register { shortcut: String, reason: String },
}

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use clipboard_manager::error::ResultExt;
///
/// // Log and keep polling if the save fails
/// store.save(&entries).log_err();
/// ```
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = %error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = %error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_err_passes_through_ok() {
        let result: Result<u32, DecryptError> = Ok(7);
        assert_eq!(result.log_err(), Some(7));
    }

    #[test]
    fn test_warn_on_err_swallows_error() {
        let result: Result<u32, DecryptError> = Err(DecryptError::Authentication);
        assert_eq!(result.warn_on_err(), None);
    }

    #[test]
    fn test_load_error_keeps_decrypt_cause() {
        let err = LoadError::from(DecryptError::Truncated { len: 3 });
        assert!(matches!(
            err,
            LoadError::Decrypt(DecryptError::Truncated { len: 3 })
        ));
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_key_error_mentions_path() {
        let err = KeyIoError::Malformed {
            path: PathBuf::from("/tmp/key"),
            reason: "bad length".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/key"));
        assert!(msg.contains("bad length"));
    }
}
