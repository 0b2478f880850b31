//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Work and break interval lengths and the long-break cadence
//! - Display behavior for the running session
//! - Keys bound to pause, stop and complete
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, Result, ValidationError};
use crate::timer::{KeyBindings, SessionConfig};

/// Interval lengths, in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSection {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_short_break")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break")]
    pub long_break_minutes: u32,
    #[serde(default = "default_pomodoros_before_long_break")]
    pub pomodoros_before_long_break: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Ring the terminal bell when a phase ends.
    #[serde(default = "default_true")]
    pub bell_on_phase_end: bool,
    /// Show mm:ss instead of whole minutes.
    #[serde(default = "default_true")]
    pub show_seconds: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    #[serde(default = "default_pause_key")]
    pub toggle_pause: char,
    #[serde(default = "default_stop_key")]
    pub stop: char,
    #[serde(default = "default_complete_key")]
    pub complete: char,
}

impl KeysConfig {
    /// Space always toggles pause, and keys match case-insensitively, so
    /// each binding must be a distinct non-space character.
    fn validate(&self) -> std::result::Result<(), String> {
        let bindings = [
            ("toggle_pause", self.toggle_pause),
            ("stop", self.stop),
            ("complete", self.complete),
        ];
        for (i, (name, key)) in bindings.iter().enumerate() {
            if key.is_whitespace() {
                return Err(format!("keys.{name} cannot be whitespace"));
            }
            for (other, other_key) in &bindings[i + 1..] {
                if key.eq_ignore_ascii_case(other_key) {
                    return Err(format!("keys.{name} and keys.{other} share '{key}'"));
                }
            }
        }
        Ok(())
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub keys: KeysConfig,
}

fn default_work_minutes() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_pomodoros_before_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}
fn default_pause_key() -> char {
    'p'
}
fn default_stop_key() -> char {
    's'
}
fn default_complete_key() -> char {
    'c'
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break(),
            long_break_minutes: default_long_break(),
            pomodoros_before_long_break: default_pomodoros_before_long_break(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            bell_on_phase_end: true,
            show_seconds: true,
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            toggle_pause: default_pause_key(),
            stop: default_stop_key(),
            complete: default_complete_key(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    let n = value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                    serde_json::Value::Number(n.into())
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    return Err(invalid("cannot set a whole section".into()));
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)
                    .map_err(|e| ConfigError::ParseFailed(format!("{}: {e}", path.display())))?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, writing defaults");
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key, typed by the current value.
    ///
    /// Only updates `self`; call [`Config::save`] to persist. Values that
    /// would make the session config invalid are rejected.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated
            .session_config()
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated
            .keys
            .validate()
            .map_err(|message| ConfigError::InvalidValue {
                key: key.to_string(),
                message,
            })?;
        *self = updated;
        Ok(())
    }

    /// Validated engine configuration built from `[session]`.
    pub fn session_config(&self) -> Result<SessionConfig, ValidationError> {
        SessionConfig::from_minutes(
            self.session.work_minutes,
            self.session.short_break_minutes,
            self.session.long_break_minutes,
            self.session.pomodoros_before_long_break,
        )
    }

    pub fn key_bindings(&self) -> KeyBindings {
        KeyBindings {
            toggle_pause: self.keys.toggle_pause,
            stop: self.keys.stop,
            complete: self.keys.complete,
        }
    }
}
