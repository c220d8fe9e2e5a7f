//! Clipboard monitoring
//!
//! Background thread that polls the clipboard and feeds new text into the
//! history engine.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::clipboard::ClipboardAccess;
use super::engine::HistoryEngine;
use crate::config::Config;
use crate::shutdown::ShutdownSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Waiting for the next tick with the last observed value cached
    Idle,
    /// In the middle of a clipboard read
    Checking,
}

/// What a single poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing readable (empty, non-text, or clipboard unavailable)
    Empty,
    /// Same text as the previous observation; engine not consulted
    Unchanged,
    /// New text inserted into history
    Added,
    /// New observation, but the engine already held that text
    Duplicate,
    /// Text exceeded the configured length limit and was skipped
    Oversized,
}

pub struct ClipboardMonitor {
    engine: Arc<HistoryEngine>,
    clipboard: Box<dyn ClipboardAccess>,
    poll_interval: Duration,
    config: Config,
    state: MonitorState,
    last_observed: Option<String>,
}

impl ClipboardMonitor {
    pub fn new(
        engine: Arc<HistoryEngine>,
        clipboard: Box<dyn ClipboardAccess>,
        config: &Config,
    ) -> Self {
        Self {
            engine,
            clipboard,
            poll_interval: config.get_poll_interval(),
            config: config.clone(),
            state: MonitorState::Idle,
            last_observed: None,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn last_observed(&self) -> Option<&str> {
        self.last_observed.as_deref()
    }

    /// Run one tick: read the clipboard and hand new text to the engine.
    ///
    /// The last observed value is updated whether or not the engine
    /// inserted it, so an unchanged clipboard is never reprocessed.
    pub fn poll_once(&mut self) -> PollOutcome {
        self.state = MonitorState::Checking;
        let outcome = self.check_clipboard();
        self.state = MonitorState::Idle;
        outcome
    }

    fn check_clipboard(&mut self) -> PollOutcome {
        let Some(current) = self.clipboard.read().filter(|text| !text.is_empty()) else {
            return PollOutcome::Empty;
        };

        if self.last_observed.as_deref() == Some(current.as_str()) {
            return PollOutcome::Unchanged;
        }

        let outcome = if self.config.is_text_over_limit(&current) {
            warn!(
                text_len = current.len(),
                max_len = self.config.get_max_text_length(),
                "Skipping oversized clipboard text entry"
            );
            PollOutcome::Oversized
        } else if self.engine.add(&current) {
            debug!(text_len = current.len(), "New text detected in clipboard");
            PollOutcome::Added
        } else {
            debug!(text_len = current.len(), "Clipboard text already in history");
            PollOutcome::Duplicate
        };

        self.last_observed = Some(current);
        outcome
    }

    /// Start polling on a dedicated thread until `shutdown` is triggered.
    pub fn spawn(mut self, shutdown: ShutdownSignal) -> std::io::Result<MonitorHandle> {
        let handle = thread::Builder::new()
            .name("clipboard-monitor".to_string())
            .spawn(move || {
                info!(
                    poll_interval_ms = self.poll_interval.as_millis() as u64,
                    "Clipboard monitor started"
                );
                loop {
                    if shutdown.is_triggered() {
                        break;
                    }

                    let start = Instant::now();
                    self.poll_once();

                    // Sleep for remaining time in poll interval, waking early on stop
                    let remaining = self.poll_interval.saturating_sub(start.elapsed());
                    if shutdown.wait_timeout(remaining) {
                        break;
                    }
                }
                info!("Clipboard monitor stopping");
            })?;

        Ok(MonitorHandle { handle })
    }
}

/// Join handle for a running monitor thread.
pub struct MonitorHandle {
    handle: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the monitor to exit. Trigger its shutdown signal first.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}
