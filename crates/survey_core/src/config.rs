use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub database: PathBuf,
    pub catalog: PathBuf,
    pub export: ExportConfig,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: PathBuf,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// "pretty", "compact" or "json".
    pub format: String,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("survey.db"),
            catalog: PathBuf::from("data/catalog.yaml"),
            export: ExportConfig::default(),
            log: LogSettings::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            title: "damage-survey".to_string(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: "compact".to_string(),
        }
    }
}

impl SurveyConfig {
    /// Read the config file; without one, every setting takes its default.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: SurveyConfig = toml::from_str(
            r#"
            database = "/var/lib/survey/survey.db"

            [export]
            title = "south-sector"
            "#,
        )
        .unwrap();
        assert_eq!(config.database, PathBuf::from("/var/lib/survey/survey.db"));
        assert_eq!(config.catalog, PathBuf::from("data/catalog.yaml"));
        assert_eq!(config.export.title, "south-sector");
        assert_eq!(config.export.dir, PathBuf::from("."));
        assert_eq!(config.log.format, "compact");
    }

    #[test]
    fn missing_path_means_defaults() {
        let config = SurveyConfig::load(None).unwrap();
        assert_eq!(config.database, PathBuf::from("survey.db"));
        assert!(SurveyConfig::load(Some(Path::new("/nonexistent/survey.toml"))).is_err());
    }
}
