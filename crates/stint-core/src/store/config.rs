//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Pomodoro cycle durations
//! - Alarm behavior (ring length, skip policy)
//! - Desktop notification preferences
//!
//! Configuration is stored at `<data_dir>/config.toml`. These are the
//! caller-owned settings; a run snapshots them at start time and is not
//! affected by later edits.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::{AlarmPolicy, PomodoroConfig};

/// Pomodoro cycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PomodoroSettings {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u64,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u64,
    #[serde(default = "default_rounds_before_long_break")]
    pub rounds_before_long_break: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u64,
}

/// Alarm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How long a boundary alarm keeps ringing before the auto-stop.
    #[serde(default = "default_ring_seconds")]
    pub ring_seconds: u64,
    /// Ring for user-initiated phase skips too, not only natural
    /// completions. A skip that ends the whole run always rings.
    #[serde(default)]
    pub ring_on_skip: bool,
}

/// Desktop notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub pomodoro: PomodoroSettings,
    #[serde(default)]
    pub alarm: AlarmSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

// Default functions
fn default_work_minutes() -> u64 {
    25
}
fn default_break_minutes() -> u64 {
    5
}
fn default_rounds_before_long_break() -> u32 {
    4
}
fn default_long_break_minutes() -> u64 {
    15
}
fn default_ring_seconds() -> u64 {
    10
}
fn default_true() -> bool {
    true
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
            rounds_before_long_break: default_rounds_before_long_break(),
            long_break_minutes: default_long_break_minutes(),
        }
    }
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ring_seconds: default_ring_seconds(),
            ring_on_skip: false,
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { enabled: true }
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
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(ConfigError::MissingKey("config key is empty".into()));
        }

        let unknown = || ConfigError::MissingKey(key.to_string());

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|_| ConfigError::InvalidValue {
                            key: key.to_string(),
                            message: format!("cannot parse '{value}' as bool"),
                        })?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                            key: key.to_string(),
                            message: format!("cannot parse '{value}' as number"),
                        })?;
                        serde_json::Value::Number(n.into())
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("<data_dir>"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
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

    /// Set a config value by key and persist the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.save()?;
        Ok(())
    }

    /// The pomodoro cycle a new run should snapshot.
    pub fn pomodoro_config(&self) -> PomodoroConfig {
        PomodoroConfig {
            work_minutes: self.pomodoro.work_minutes,
            break_minutes: self.pomodoro.break_minutes,
            rounds_before_long_break: self.pomodoro.rounds_before_long_break,
            long_break_minutes: self.pomodoro.long_break_minutes,
        }
    }

    /// How the engine should ring, per the alarm settings.
    pub fn alarm_policy(&self) -> AlarmPolicy {
        AlarmPolicy {
            ring_ms: self.alarm.ring_seconds.saturating_mul(1000),
            ring_on_skip: self.alarm.ring_on_skip,
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
