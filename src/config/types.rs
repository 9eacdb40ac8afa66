//! Configuration types for runtime level control.

use crate::level::Level;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Component name under which the subsystem's own diagnostic logger is
/// registered.
pub const LEVEL_CHANGER_COMPONENT: &str = "LevelChanger";

/// Validated level configuration.
///
/// Immutable once built. A reload replaces the whole value; nothing mutates a
/// configuration that is already in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Level for every component without an override.
    #[serde(rename = "level")]
    pub default_level: Level,
    /// Per-component overrides, keyed by exact component name.
    #[serde(rename = "levels", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, Level>,
}

impl LevelConfig {
    /// Configuration with a default level and no overrides.
    pub fn new(default_level: Level) -> Self {
        Self {
            default_level,
            overrides: BTreeMap::new(),
        }
    }

    /// Add an override for one component.
    pub fn with_override(mut self, component: impl Into<String>, level: Level) -> Self {
        self.overrides.insert(component.into(), level);
        self
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

/// Serialization format of the watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick the format from the file extension. Anything that is not
    /// `.yaml`/`.yml` is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => DocumentFormat::Yaml,
            _ => DocumentFormat::Json,
        }
    }
}

/// Default location of the watched level file.
pub const DEFAULT_LEVELS_PATH: &str = "levels.json";

/// Fixed delay before a failed watch is acquired again.
pub const DEFAULT_RESTART_BACKOFF: Duration = Duration::from_secs(10);

/// Construction-time settings for the level changer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangerSettings {
    /// Path of the watched level file.
    pub path: PathBuf,
    /// Default level used until the file is read successfully.
    pub initial_level: Level,
    /// Delay before re-acquiring a watch after any failure.
    pub restart_backoff: Duration,
}

impl Default for ChangerSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LEVELS_PATH),
            initial_level: Level::Info,
            restart_backoff: DEFAULT_RESTART_BACKOFF,
        }
    }
}

impl ChangerSettings {
    /// Settings for a path with default level and backoff.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the initial default level.
    pub fn with_initial_level(mut self, level: Level) -> Self {
        self.initial_level = level;
        self
    }

    /// Set the restart backoff.
    pub fn with_restart_backoff(mut self, backoff: Duration) -> Self {
        self.restart_backoff = backoff;
        self
    }

    /// Build settings from the environment, falling back to defaults.
    ///
    /// - `LEVEL_WATCH_PATH` - watched file
    /// - `LEVEL_WATCH_LEVEL` - initial default level
    /// - `LEVEL_WATCH_BACKOFF_SECS` - restart backoff in seconds
    ///
    /// Unparseable values, and a zero backoff, are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(path) = lookup("LEVEL_WATCH_PATH") {
            settings.path = PathBuf::from(path);
        }

        if let Some(raw) = lookup("LEVEL_WATCH_LEVEL") {
            match raw.parse::<Level>() {
                Ok(level) => settings.initial_level = level,
                Err(e) => tracing::warn!("Ignoring LEVEL_WATCH_LEVEL: {}", e),
            }
        }

        if let Some(raw) = lookup("LEVEL_WATCH_BACKOFF_SECS") {
            match raw.parse::<u64>() {
                Ok(0) => tracing::warn!("Ignoring LEVEL_WATCH_BACKOFF_SECS=0: backoff must be at least 1s"),
                Ok(secs) => settings.restart_backoff = Duration::from_secs(secs),
                Err(e) => tracing::warn!("Ignoring LEVEL_WATCH_BACKOFF_SECS={}: {}", raw, e),
            }
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_equality_is_by_value() {
        let a = LevelConfig::new(Level::Info).with_override("Foo", Level::Warn);
        let b = LevelConfig::new(Level::Info).with_override("Foo", Level::Warn);
        assert_eq!(a, b);
        assert_ne!(a, LevelConfig::new(Level::Info));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(DocumentFormat::from_path(Path::new("levels.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("levels.yaml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("levels.yml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("levels")), DocumentFormat::Json);
    }

    #[test]
    fn test_settings_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LEVEL_WATCH_PATH", "/etc/app/levels.yaml"),
            ("LEVEL_WATCH_LEVEL", "debug"),
            ("LEVEL_WATCH_BACKOFF_SECS", "3"),
        ]);
        let settings = ChangerSettings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.path, PathBuf::from("/etc/app/levels.yaml"));
        assert_eq!(settings.initial_level, Level::Debug);
        assert_eq!(settings.restart_backoff, Duration::from_secs(3));
    }

    #[test]
    fn test_settings_ignore_bad_env_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LEVEL_WATCH_LEVEL", "loud"),
            ("LEVEL_WATCH_BACKOFF_SECS", "soon"),
        ]);
        let settings = ChangerSettings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings, ChangerSettings::default());
    }

    #[test]
    fn test_settings_reject_zero_backoff() {
        let env: HashMap<&str, &str> = HashMap::from([("LEVEL_WATCH_BACKOFF_SECS", "0")]);
        let settings = ChangerSettings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.restart_backoff, DEFAULT_RESTART_BACKOFF);
    }
}
