//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Whether reminders are enabled
//! - Session defaults (exercise and rest durations, get-ready countdown)
//! - Sound and vibration feedback
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;

/// Reminder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindersConfig {
    /// Global switch. Turning it off cancels every pending reminder.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_nutrition_message")]
    pub nutrition_message: String,
}

/// Session defaults used for workouts that don't set their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_exercise_secs")]
    pub default_exercise_secs: u32,
    #[serde(default = "default_rest_secs")]
    pub rest_secs: u32,
    /// Countdown before the first exercise; 0 disables it.
    #[serde(default = "default_get_ready_secs")]
    pub get_ready_secs: u32,
}

/// Feedback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default = "default_true")]
    pub sound: bool,
    #[serde(default = "default_true")]
    pub vibration: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reminders: RemindersConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

fn default_true() -> bool {
    true
}
fn default_nutrition_message() -> String {
    "Time to log your meal!".into()
}
fn default_exercise_secs() -> u32 {
    30
}
fn default_rest_secs() -> u32 {
    15
}
fn default_get_ready_secs() -> u32 {
    5
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            nutrition_message: default_nutrition_message(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_exercise_secs: default_exercise_secs(),
            rest_secs: default_rest_secs(),
            get_ready_secs: default_get_ready_secs(),
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            sound: true,
            vibration: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reminders: RemindersConfig::default(),
            session: SessionConfig::default(),
            feedback: FeedbackConfig::default(),
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
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot replace a whole section".into()));
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

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
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

    /// Update a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert!(parsed.reminders.enabled);
        assert_eq!(parsed.session.rest_secs, 15);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("[reminders]\nenabled = false\n").unwrap();
        assert!(!parsed.reminders.enabled);
        assert_eq!(parsed.reminders.nutrition_message, "Time to log your meal!");
        assert_eq!(parsed.session.get_ready_secs, 5);
        assert!(parsed.feedback.vibration);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("reminders.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("session.default_exercise_secs").as_deref(), Some("30"));
        assert!(cfg.get("session.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("reminders.enabled", "false").unwrap();
        cfg.apply("session.rest_secs", "20").unwrap();
        cfg.apply("reminders.nutrition_message", "Eat!").unwrap();
        assert!(!cfg.reminders.enabled);
        assert_eq!(cfg.session.rest_secs, 20);
        assert_eq!(cfg.reminders.nutrition_message, "Eat!");
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("reminders.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("feedback.sound", "not_a_bool"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.apply("session.rest_secs", "-3").is_err());
        assert!(cfg.apply("session", "x").is_err());
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(cfg.reminders.enabled);
        assert!(path.exists());

        let mut cfg = cfg;
        cfg.apply("reminders.enabled", "false").unwrap();
        cfg.save_to(&path).unwrap();
        assert!(!Config::load_from(&path).unwrap().reminders.enabled);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session\nrest_secs = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
