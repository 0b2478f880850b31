//! Keypress source for running sessions.
//!
//! Reads the terminal on a dedicated thread and forwards mapped keys as
//! [`ControlSignal`]s. Read errors are treated as "no key this poll".

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use pomotask_core::{ControlSignal, KeyBindings};
use tokio::sync::mpsc;

/// Upper bound on how long one poll blocks.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Enables raw mode for its lifetime.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> std::io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            tracing::warn!(error = %e, "failed to restore terminal mode");
        }
    }
}

pub fn map_key(keys: &KeyBindings, key: KeyEvent) -> Option<ControlSignal> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(ControlSignal::Stop);
    }
    match key.code {
        KeyCode::Char(c) => keys.signal_for(c),
        KeyCode::Esc => Some(ControlSignal::Stop),
        _ => None,
    }
}

/// Spawn the listener. It exits once the receiving side is dropped.
pub fn spawn_listener(keys: KeyBindings, tx: mpsc::Sender<ControlSignal>) -> JoinHandle<()> {
    thread::spawn(move || {
        while !tx.is_closed() {
            let ready = match event::poll(POLL_INTERVAL) {
                Ok(ready) => ready,
                Err(e) => {
                    tracing::debug!(error = %e, "keyboard poll failed");
                    thread::sleep(POLL_INTERVAL);
                    continue;
                }
            };
            if !ready {
                continue;
            }
            match event::read() {
                Ok(Event::Key(key)) => {
                    if let Some(signal) = map_key(&keys, key) {
                        tracing::debug!(?signal, "key signal");
                        if tx.blocking_send(signal).is_err() {
                            break;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "keyboard read failed"),
            }
        }
    })
}
