//! Sync configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/todocal/config.toml` by default. A missing file means defaults.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::EventResult;
use crate::timezone::parse_timezone;

/// Errors raised while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Configuration for a calendar-to-tasks sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Debug mode.
    pub debug: bool,

    /// Calendar source settings.
    pub calendar: CalendarSettings,

    /// Task manager settings.
    pub todoist: TodoistSettings,
}

/// Settings of the calendar being synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Calendar to read events from.
    pub calendar_id: String,

    /// IANA zone for timed values without one, and for all-day `UNTIL`
    /// bounds.
    pub default_timezone: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            default_timezone: "UTC".to_string(),
        }
    }
}

impl CalendarSettings {
    /// Parses [`CalendarSettings::default_timezone`].
    pub fn timezone(&self) -> EventResult<Tz> {
        parse_timezone(&self.default_timezone)
    }
}

/// Settings of the task manager events are mirrored to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoistSettings {
    /// Project that receives the synced items.
    pub project: String,

    /// Label attached to synced items.
    pub label: Option<String>,
}

impl Default for TodoistSettings {
    fn default() -> Self {
        Self {
            project: "Calendar".to_string(),
            label: None,
        }
    }
}

impl SyncConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("todocal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EventError;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert!(!config.debug);
        assert_eq!(config.calendar.calendar_id, "primary");
        assert_eq!(config.calendar.timezone().unwrap(), Tz::UTC);
        assert_eq!(config.todoist.project, "Calendar");
        assert_eq!(config.todoist.label, None);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [calendar]
            default_timezone = "America/New_York"
            "#,
        )
        .unwrap();
        assert_eq!(config.calendar.calendar_id, "primary");
        assert_eq!(
            config.calendar.timezone().unwrap(),
            chrono_tz::America::New_York
        );
        assert_eq!(config.todoist, TodoistSettings::default());
    }

    #[test]
    fn full_file() {
        let config: SyncConfig = toml::from_str(
            r#"
            debug = true

            [calendar]
            calendar_id = "team@example.com"
            default_timezone = "Europe/Sofia"

            [todoist]
            project = "Meetings"
            label = "calendar"
            "#,
        )
        .unwrap();
        assert!(config.debug);
        assert_eq!(config.calendar.calendar_id, "team@example.com");
        assert_eq!(config.todoist.project, "Meetings");
        assert_eq!(config.todoist.label.as_deref(), Some("calendar"));
    }

    #[test]
    fn unknown_timezone() {
        let settings = CalendarSettings {
            default_timezone: "Nowhere/Special".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.timezone(),
            Err(EventError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[todoist]\nproject = \"Work\"").unwrap();
        let config = SyncConfig::load_from(file.path()).unwrap();
        assert_eq!(config.todoist.project, "Work");
    }

    #[test]
    fn load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            SyncConfig::load_from(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "calendar = [").unwrap();
        let err = SyncConfig::load_from(&broken).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn default_path_ends_with_todocal() {
        let path = SyncConfig::default_path();
        assert!(path.ends_with("todocal/config.toml"));
    }
}
