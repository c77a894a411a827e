//! TOML-based application configuration.
//!
//! Stores:
//! - Whether snapshots are persisted, and under which key and database file
//! - An optional fixed seed for the month simulation
//!
//! Configuration is stored at `~/.config/drift/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};

/// Snapshot storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// When false the engine runs purely in memory.
    #[serde(default = "default_true")]
    pub persist: bool,
    /// Key the snapshot is stored under.
    #[serde(default = "default_key")]
    pub key: String,
    /// Database file name, relative to the data directory.
    #[serde(default = "default_database")]
    pub database: String,
}

/// Month simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Fixed RNG seed; `None` draws from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/drift/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Keys holding optional values; `none` or an empty string clears them.
const NULLABLE_KEYS: [&str; 1] = ["simulation.seed"];

fn default_true() -> bool {
    true
}
fn default_key() -> String {
    "drift".into()
}
fn default_database() -> String {
    super::database::DEFAULT_DB_FILE.into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persist: true,
            key: default_key(),
            database: default_database(),
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
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent_path, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parent_path) = parent_path {
            for part in parent_path.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let clears = value.is_empty() || value.eq_ignore_ascii_case("none");
        let new_value = match existing {
            _ if clears && NULLABLE_KEYS.contains(&key) => serde_json::Value::Null,
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
            ),
            // Optional numeric fields serialize as null when unset.
            serde_json::Value::Number(_) | serde_json::Value::Null => serde_json::Value::Number(
                value
                    .parse::<u64>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                    .into(),
            ),
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
            }
            serde_json::Value::String(_) => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// Path of the configuration file.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                CoreError::from(ConfigError::LoadFailed {
                    path,
                    message: e.to_string(),
                })
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| save_failed(e.to_string()))?;
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

    /// Set a config value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// as the key's type.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
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
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Full path of the snapshot database.
    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(data_dir()?.join(&self.storage.database))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
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
        assert_eq!(parsed, cfg);
        assert!(parsed.storage.persist);
        assert_eq!(parsed.storage.key, "drift");
    }

    #[test]
    fn empty_file_parses_to_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn partial_section_fills_missing_fields() {
        let parsed: Config = toml::from_str("[storage]\npersist = false\n").unwrap();
        assert!(!parsed.storage.persist);
        assert_eq!(parsed.storage.database, "drift.db");
        assert_eq!(parsed.simulation.seed, None);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("storage.persist").as_deref(), Some("true"));
        assert_eq!(cfg.get("storage.key").as_deref(), Some("drift"));
        assert_eq!(cfg.get("simulation.seed").as_deref(), Some("null"));
        assert!(cfg.get("storage.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_bool_string_and_optional_number() {
        let mut cfg = Config::default();
        cfg.apply("storage.persist", "false").unwrap();
        cfg.apply("storage.key", "drift-test").unwrap();
        cfg.apply("simulation.seed", "42").unwrap();
        assert!(!cfg.storage.persist);
        assert_eq!(cfg.storage.key, "drift-test");
        assert_eq!(cfg.simulation.seed, Some(42));

        cfg.apply("simulation.seed", "none").unwrap();
        assert_eq!(cfg.simulation.seed, None);
    }

    #[test]
    fn apply_clears_seed_after_it_was_set() {
        let mut cfg = Config::default();
        cfg.apply("simulation.seed", "42").unwrap();
        cfg.apply("simulation.seed", "none").unwrap();
        assert_eq!(cfg.simulation.seed, None);

        cfg.apply("simulation.seed", "7").unwrap();
        cfg.apply("simulation.seed", "").unwrap();
        assert_eq!(cfg.simulation.seed, None);
        assert_eq!(cfg.get("simulation.seed").as_deref(), Some("null"));
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.apply("storage.nonexistent_key", "value").unwrap_err();
        assert!(matches!(
            err,
            crate::CoreError::Config(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.apply("nope", "1").is_err());
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        let err = cfg.apply("storage.persist", "not_a_bool").unwrap_err();
        assert!(matches!(
            err,
            crate::CoreError::Config(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.storage.persist);
    }
}
