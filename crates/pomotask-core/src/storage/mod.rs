mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, DisplayConfig, KeysConfig, SessionSection};
pub use database::{Database, SessionRecord, TaskFilter};

use std::path::PathBuf;

use crate::error::Result;

/// Returns the pomotask data directory, creating it if needed.
///
/// `POMOTASK_HOME` wins when set. Otherwise `~/.config/pomotask[-dev]/`,
/// with POMOTASK_ENV=dev selecting the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("POMOTASK_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("POMOTASK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pomotask-dev")
            } else {
                base_dir.join("pomotask")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
