//! Global hotkey listener
//!
//! Registers the panel hotkey and turns presses into [`PanelTrigger::Show`]
//! messages for whichever front-end owns the receiving end.
//!
//! On macOS the hotkey manager needs the main-thread event loop; the
//! listener thread here serves X11 and Windows.

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::HotkeyConfig;
use crate::error::{HotkeyError, ResultExt};
use crate::shutdown::ShutdownSignal;

/// How often the listener wakes to check for shutdown
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Requests sent from the hotkey listener to the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelTrigger {
    Show,
}

/// Convert a config hotkey into a registrable [`HotKey`].
pub fn parse_hotkey(config: &HotkeyConfig) -> Result<HotKey, HotkeyError> {
    let mut mods = Modifiers::empty();
    for modifier in &config.modifiers {
        mods |= match modifier.to_lowercase().as_str() {
            "meta" | "cmd" | "command" | "super" => Modifiers::SUPER,
            "ctrl" | "control" => Modifiers::CONTROL,
            "alt" | "option" => Modifiers::ALT,
            "shift" => Modifiers::SHIFT,
            _ => return Err(HotkeyError::UnknownModifier(modifier.clone())),
        };
    }

    let code: Code = config
        .key
        .parse()
        .map_err(|_| HotkeyError::UnknownKey(config.key.clone()))?;

    let mods = if mods.is_empty() { None } else { Some(mods) };
    Ok(HotKey::new(mods, code))
}

/// Spawn the listener thread.
///
/// Registration failures are logged and end the listener; the rest of the
/// application keeps running without a hotkey.
pub fn spawn_listener(
    config: HotkeyConfig,
    shutdown: ShutdownSignal,
    triggers: async_channel::Sender<PanelTrigger>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("hotkey-listener".to_string())
        .spawn(move || {
            // Registration failures end the listener, never the process
            run_listener(&config, &shutdown, &triggers).warn_on_err();
        })
}

fn run_listener(
    config: &HotkeyConfig,
    shutdown: &ShutdownSignal,
    triggers: &async_channel::Sender<PanelTrigger>,
) -> Result<(), HotkeyError> {
    let shortcut = config.to_shortcut_string();
    let hotkey = parse_hotkey(config)?;

    let register_err = |reason: String| HotkeyError::Register {
        shortcut: shortcut.clone(),
        reason,
    };
    let manager = GlobalHotKeyManager::new().map_err(|e| register_err(e.to_string()))?;
    manager
        .register(hotkey)
        .map_err(|e| register_err(e.to_string()))?;

    info!(shortcut = %shortcut, hotkey_id = hotkey.id(), "Registered panel hotkey");

    let receiver = GlobalHotKeyEvent::receiver();
    while !shutdown.is_triggered() {
        match receiver.recv_timeout(EVENT_POLL_INTERVAL) {
            Ok(event) => {
                // Only respond to key PRESS, not release
                if event.id != hotkey.id() || event.state != HotKeyState::Pressed {
                    continue;
                }
                debug!(shortcut = %shortcut, "Panel hotkey pressed");
                if triggers.send_blocking(PanelTrigger::Show).is_err() {
                    info!("Panel trigger channel closed, stopping hotkey listener");
                    break;
                }
            }
            Err(e) if e.is_disconnected() => break,
            Err(_) => {}
        }
    }

    if let Err(e) = manager.unregister(hotkey) {
        debug!(error = %e, "Failed to unregister panel hotkey");
    }
    info!("Hotkey listener stopped");
    Ok(())
}
