//! Configuration management module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::timecard::TimeFormat;
use crate::timezone::{DEFAULT_TIMEZONE, LocalZone};

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timezone: TimezoneConfig,
    pub host: HostConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Zone the host's wall-clock datetimes are read in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimezoneConfig {
    /// IANA zone name.
    pub name: String,
}

/// Host script names and the browser-only fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub fetch_script: String,
    pub print_script: String,
    /// Layout queried for time-clock records.
    pub layout: String,
    /// Saved host response used when no host is attached.
    pub sample_data: PathBuf,
}

/// Display preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub time_format: TimeFormat,
    /// How long an export status message stays up.
    pub export_message_secs: u64,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily log files; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl AppConfig {
    /// Get config file path: the platform config directory, or next to the
    /// executable when none is available.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "timecard-dashboard")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            })
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => ConfigLoadResult::Loaded(config),
                    Err(e) => ConfigLoadResult::Invalid(e),
                },
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if LocalZone::from_name(&self.timezone.name).is_err() {
            return Err(ConfigError::Validation(format!(
                "Unknown time zone '{}'",
                self.timezone.name
            )));
        }
        if self.host.fetch_script.trim().is_empty() {
            return Err(ConfigError::Validation("Fetch script name cannot be empty".to_string()));
        }
        if self.host.print_script.trim().is_empty() {
            return Err(ConfigError::Validation("Print script name cannot be empty".to_string()));
        }
        if self.host.layout.trim().is_empty() {
            return Err(ConfigError::Validation("Layout name cannot be empty".to_string()));
        }
        if self.display.export_message_secs < 1 {
            return Err(ConfigError::Validation(
                "Export message duration must be at least 1 second".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation("Log level cannot be empty".to_string()));
        }
        Ok(())
    }

    /// The configured zone; only fails for an unvalidated config.
    pub fn zone(&self) -> crate::Result<LocalZone> {
        LocalZone::from_name(&self.timezone.name)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            fetch_script: "js * fetchData".to_string(),
            print_script: "js * print".to_string(),
            layout: "TimeClock".to_string(),
            sample_data: PathBuf::from("exampleData.json"),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            time_format: TimeFormat::Decimal,
            export_message_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.zone().unwrap().name(), "America/Edmonton");
    }

    #[test]
    fn test_validation_unknown_timezone() {
        let mut config = AppConfig::default();
        config.timezone.name = "Mountain Time".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_empty_scripts() {
        let mut config = AppConfig::default();
        config.host.fetch_script = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.host.print_script = String::new();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.host.layout = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_export_message_duration() {
        let mut config = AppConfig::default();
        config.display.export_message_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [timezone]
            name = "America/Chicago"

            [display]
            time_format = "hhmm"
            "#,
        )
        .unwrap();

        assert_eq!(config.timezone.name, "America/Chicago");
        assert_eq!(config.display.time_format, TimeFormat::HoursMinutes);
        assert_eq!(config.display.export_message_secs, 5);
        assert_eq!(config.host.fetch_script, "js * fetchData");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_try_load_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(matches!(AppConfig::try_load(&path), ConfigLoadResult::Missing));

        std::fs::write(&path, "[timezone]\nname = 42\n").unwrap();
        assert!(matches!(
            AppConfig::try_load(&path),
            ConfigLoadResult::Invalid(ConfigError::Parse(_))
        ));

        std::fs::write(&path, "[timezone]\nname = \"Nowhere/City\"\n").unwrap();
        assert!(matches!(
            AppConfig::try_load(&path),
            ConfigLoadResult::Invalid(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.host.layout = "Punches".to_string();
        config.logging.directory = Some(PathBuf::from("logs"));
        config.save(&path).unwrap();

        match AppConfig::try_load(&path) {
            ConfigLoadResult::Loaded(loaded) => {
                assert_eq!(loaded.host.layout, "Punches");
                assert_eq!(loaded.logging.directory, Some(PathBuf::from("logs")));
                assert_eq!(loaded.display.time_format, TimeFormat::Decimal);
            }
            other => panic!("expected loaded config, got {other:?}"),
        }
    }
}
