//! Process configuration loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{EnrollmentPolicy, MAX_CREDITS_PER_TERM};

const CONFIG_DIR_NAME: &str = "campus-records";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Enrollment rule settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentConfig {
    /// Maximum total credits a student may hold at once
    pub max_credits_per_term: u32,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            max_credits_per_term: MAX_CREDITS_PER_TERM,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database file
    pub database: String,
    /// Default directory for exports and backups
    pub data_folder: PathBuf,
    pub enrollment: EnrollmentConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: "campus.db".to_string(),
            data_folder: PathBuf::from("data"),
            enrollment: EnrollmentConfig::default(),
        }
    }
}

/// Optional CLI overrides for configuration values
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database: Option<String>,
    pub data_folder: Option<PathBuf>,
}

impl AppConfig {
    /// Default location of the config file:
    /// `<platform config dir>/campus-records/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Load from an explicit file. The file must exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Load from `path` if given, otherwise from the default location when a file
    /// is present there, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Self::default_path();
                if default_path.is_file() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply CLI-provided overrides for this run only.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(database) = &overrides.database {
            self.database.clone_from(database);
        }
        if let Some(data_folder) = &overrides.data_folder {
            self.data_folder.clone_from(data_folder);
        }
    }

    pub fn enrollment_policy(&self) -> EnrollmentPolicy {
        EnrollmentPolicy {
            max_credits_per_term: self.enrollment.max_credits_per_term,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.database, "campus.db");
        assert_eq!(config.data_folder, PathBuf::from("data"));
        assert_eq!(config.enrollment_policy(), EnrollmentPolicy::default());
    }

    #[test]
    fn test_partial_config() {
        let config = AppConfig::from_toml(
            r#"
            database = "records.db"

            [enrollment]
            max_credits_per_term = 24
            "#,
        )
        .unwrap();
        assert_eq!(config.database, "records.db");
        assert_eq!(config.data_folder, PathBuf::from("data"));
        assert_eq!(config.enrollment_policy().max_credits_per_term, 24);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        assert!(AppConfig::from_toml("database = [").is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(&ConfigOverrides {
            database: Some("other.db".into()),
            data_folder: None,
        });
        assert_eq!(config.database, "other.db");
        assert_eq!(config.data_folder, PathBuf::from("data"));
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.enrollment.max_credits_per_term = 18;
        fs::write(&path, config.to_toml().unwrap()).unwrap();

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.enrollment.max_credits_per_term, 18);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
