mod config;
pub mod database;
pub mod snapshot;

pub use config::{AlarmSettings, Config, NotificationSettings, PomodoroSettings};
pub use database::{Database, RecordStats};
pub use snapshot::{SnapshotStore, TimerSnapshot};

use std::path::PathBuf;

/// Returns `~/.config/stint[-dev]/` based on STINT_ENV.
///
/// Set STINT_ENV=dev to use the development data directory, or
/// STINT_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("STINT_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("STINT_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("stint-dev")
            } else {
                base_dir.join("stint")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
