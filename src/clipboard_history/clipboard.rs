//! System clipboard access
//!
//! The engine never talks to the OS directly; the monitor and the panel go
//! through [`ClipboardAccess`], which tests replace with an in-memory fake.

use arboard::Clipboard;
use tracing::{debug, warn};

use crate::error::ClipboardAccessError;

/// Read/write access to the plain-text clipboard.
pub trait ClipboardAccess: Send {
    /// Current clipboard text, or None when there is nothing readable
    /// (empty clipboard, non-text content, or the clipboard is unavailable).
    fn read(&mut self) -> Option<String>;

    /// Replace the clipboard contents with `text`.
    fn write(&mut self, text: &str) -> Result<(), ClipboardAccessError>;
}

/// arboard-backed clipboard, connected lazily so a missing display server
/// only costs a failed read instead of a failed startup.
///
/// On X11/Wayland the instance that wrote the clipboard must stay alive for
/// other applications to paste, so keep one `SystemClipboard` per front-end.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> Result<&mut Clipboard, ClipboardAccessError> {
        if self.inner.is_none() {
            let clipboard =
                Clipboard::new().map_err(|e| ClipboardAccessError::Unavailable(e.to_string()))?;
            self.inner = Some(clipboard);
        }
        self.inner
            .as_mut()
            .ok_or_else(|| ClipboardAccessError::Unavailable("clipboard not connected".into()))
    }
}

impl ClipboardAccess for SystemClipboard {
    fn read(&mut self) -> Option<String> {
        let clipboard = match self.handle() {
            Ok(clipboard) => clipboard,
            Err(e) => {
                debug!(error = %e, "Clipboard not available this tick");
                return None;
            }
        };

        match clipboard.get_text() {
            Ok(text) => Some(text),
            Err(arboard::Error::ContentNotAvailable) => None,
            Err(e) => {
                debug!(error = %e, "Failed to read clipboard text");
                // Reconnect on the next tick in case the connection went stale
                self.inner = None;
                None
            }
        }
    }

    fn write(&mut self, text: &str) -> Result<(), ClipboardAccessError> {
        let clipboard = self.handle()?;
        clipboard.set_text(text.to_string()).map_err(|e| {
            warn!(error = %e, "Failed to write clipboard text");
            ClipboardAccessError::Write(e.to_string())
        })
    }
}
