use serde::{Deserialize, Serialize};

/// Control input delivered to a running session.
///
/// Anything the keypress source cannot map to one of these is dropped
/// before it reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSignal {
    TogglePause,
    Stop,
    CompleteNow,
}

/// Keys bound to each signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub toggle_pause: char,
    pub stop: char,
    pub complete: char,
}

impl KeyBindings {
    /// Map a key to its signal. Matching is case-insensitive.
    pub fn signal_for(&self, key: char) -> Option<ControlSignal> {
        let key = key.to_ascii_lowercase();
        if key == self.toggle_pause.to_ascii_lowercase() || key == ' ' {
            Some(ControlSignal::TogglePause)
        } else if key == self.stop.to_ascii_lowercase() {
            Some(ControlSignal::Stop)
        } else if key == self.complete.to_ascii_lowercase() {
            Some(ControlSignal::CompleteNow)
        } else {
            None
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            toggle_pause: 'p',
            stop: 's',
            complete: 'c',
        }
    }
}
