//! Clipboard Manager - encrypted clipboard history with pinning
//!
//! A background monitor records plain-text clipboard changes into a
//! bounded, deduplicated history that is encrypted at rest. A global
//! hotkey asks the front-end to show the history panel.

pub mod app;
pub mod clipboard_history;
pub mod config;
pub mod error;
pub mod hotkey;
pub mod logging;
pub mod panel;
pub mod shutdown;
