//! Application wiring
//!
//! Starts the background tasks around a shared [`HistoryEngine`]: the
//! clipboard monitor and the hotkey listener. Front-ends read
//! [`App::triggers`] to learn when to show the panel.

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::info;

use crate::clipboard_history::{
    ClipboardAccess, ClipboardMonitor, HistoryEngine, MonitorHandle, SystemClipboard,
};
use crate::config::Config;
use crate::error::ResultExt;
use crate::hotkey::{self, PanelTrigger};
use crate::shutdown::ShutdownSignal;

pub struct App {
    engine: Arc<HistoryEngine>,
    shutdown: ShutdownSignal,
    monitor: MonitorHandle,
    hotkey_listener: Option<JoinHandle<()>>,
    triggers: async_channel::Receiver<PanelTrigger>,
}

impl App {
    /// Open the persisted history and start monitoring the system clipboard.
    pub fn start(config: &Config) -> Result<Self> {
        let engine = HistoryEngine::open(config).context("Failed to open clipboard history")?;
        info!(
            entries = engine.len(),
            max_history = engine.max_history(),
            "Clipboard history loaded"
        );
        Self::start_with(
            config,
            Arc::new(engine),
            Box::new(SystemClipboard::new()),
            true,
        )
    }

    /// Start with explicit parts. `register_hotkey` is false for headless use.
    pub fn start_with(
        config: &Config,
        engine: Arc<HistoryEngine>,
        clipboard: Box<dyn ClipboardAccess>,
        register_hotkey: bool,
    ) -> Result<Self> {
        let shutdown = ShutdownSignal::new();
        let (trigger_tx, trigger_rx) = async_channel::unbounded();

        let monitor = ClipboardMonitor::new(Arc::clone(&engine), clipboard, config)
            .spawn(shutdown.clone())
            .context("Failed to spawn clipboard monitor")?;

        let hotkey_listener = if register_hotkey {
            let listener = hotkey::spawn_listener(config.get_hotkey(), shutdown.clone(), trigger_tx)
                .context("Failed to spawn hotkey listener");
            match listener {
                Ok(handle) => Some(handle),
                Err(e) => {
                    shutdown.trigger();
                    let _ = monitor.join();
                    return Err(e);
                }
            }
        } else {
            None
        };

        info!(hotkey = register_hotkey, "Clipboard manager started");

        Ok(Self {
            engine,
            shutdown,
            monitor,
            hotkey_listener,
            triggers: trigger_rx,
        })
    }

    pub fn engine(&self) -> &Arc<HistoryEngine> {
        &self.engine
    }

    /// Panel show requests from the hotkey listener.
    pub fn triggers(&self) -> &async_channel::Receiver<PanelTrigger> {
        &self.triggers
    }

    /// A handle other threads can use to stop the app.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Stop every background task and wait for it to exit.
    pub fn shutdown(self) -> Result<()> {
        info!("Shutting down clipboard manager");
        self.shutdown.trigger();
        self.triggers.close();

        self.monitor
            .join()
            .map_err(|_| anyhow!("Clipboard monitor thread panicked"))?;
        if let Some(listener) = self.hotkey_listener {
            listener
                .join()
                .map_err(|_| anyhow!("Hotkey listener thread panicked"))?;
        }

        // Retry a snapshot whose automatic save failed
        self.engine.save_now().log_err();

        info!(entries = self.engine.len(), "Clipboard manager stopped");
        Ok(())
    }
}
