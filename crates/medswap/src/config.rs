//! Configuration management for medswap.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::autocomplete::{MedicineCatalog, DEFAULT_MAX_SUGGESTIONS};
use crate::error::{Error, Result};
use crate::storage::{DEFAULT_MAX_ATTEMPTS, DEFAULT_SLOT_KEY};
use crate::view::{DEFAULT_COORDINATE_PRECISION, DONORS_TAB, RECIPIENTS_TAB};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "medswap";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "medswap.db";

/// Largest accepted coordinate precision.
const MAX_COORDINATE_PRECISION: usize = 10;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `MEDSWAP_`)
/// 2. TOML config file at `~/.config/medswap/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Medicine catalog configuration.
    pub catalog: CatalogConfig,
    /// Rendering configuration.
    pub render: RenderConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/medswap/medswap.db`
    pub database_path: Option<PathBuf>,
    /// Slot key holding the record list.
    pub slot_key: String,
    /// Append attempts before giving up when another writer interferes.
    pub max_append_retries: u32,
}

/// Medicine catalog configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Maximum number of autocomplete suggestions.
    pub max_suggestions: usize,
    /// Names added after the built-in list.
    pub extra_medicines: Vec<String>,
    /// Also suggest medicines found in stored records.
    pub include_stored: bool,
}

/// Rendering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Decimals shown for coordinates.
    pub coordinate_precision: usize,
    /// Tab active when a page is first rendered.
    pub default_tab: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            slot_key: DEFAULT_SLOT_KEY.to_string(),
            max_append_retries: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            extra_medicines: Vec::new(),
            include_stored: true,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            coordinate_precision: DEFAULT_COORDINATE_PRECISION,
            default_tab: DONORS_TAB.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources, reading `config_path` instead of
    /// the default file when given.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("MEDSWAP_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.slot_key.trim().is_empty() {
            return Err(Error::config_validation("slot_key must not be empty"));
        }

        if self.storage.max_append_retries == 0 {
            return Err(Error::config_validation(
                "max_append_retries must be greater than 0",
            ));
        }

        if self.catalog.max_suggestions == 0 {
            return Err(Error::config_validation(
                "max_suggestions must be greater than 0",
            ));
        }

        if self.render.coordinate_precision > MAX_COORDINATE_PRECISION {
            return Err(Error::config_validation(format!(
                "coordinate_precision ({}) cannot be greater than {MAX_COORDINATE_PRECISION}",
                self.render.coordinate_precision
            )));
        }

        if ![DONORS_TAB, RECIPIENTS_TAB].contains(&self.render.default_tab.as_str()) {
            return Err(Error::config_validation(format!(
                "unknown default_tab: {}",
                self.render.default_tab
            )));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Build the medicine catalog: built-ins followed by configured extras.
    #[must_use]
    pub fn catalog(&self) -> MedicineCatalog {
        let mut catalog =
            MedicineCatalog::builtin().with_max_suggestions(self.catalog.max_suggestions);
        catalog.extend(self.catalog.extra_medicines.iter().map(String::as_str));
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert_eq!(config.storage.slot_key, "medswap_users");
        assert_eq!(config.storage.max_append_retries, 3);
        assert_eq!(config.catalog.max_suggestions, 8);
        assert!(config.catalog.include_stored);
        assert_eq!(config.render.coordinate_precision, 4);
        assert_eq!(config.render.default_tab, "donors");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_slot_key() {
        let mut config = Config::default();
        config.storage.slot_key = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("slot_key"));
    }

    #[test]
    fn test_validate_zero_retries() {
        let mut config = Config::default();
        config.storage.max_append_retries = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_append_retries"));
    }

    #[test]
    fn test_validate_zero_suggestions() {
        let mut config = Config::default();
        config.catalog.max_suggestions = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_suggestions"));
    }

    #[test]
    fn test_validate_precision_limit() {
        let mut config = Config::default();
        config.render.coordinate_precision = 11;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("coordinate_precision"));
    }

    #[test]
    fn test_validate_unknown_tab() {
        let mut config = Config::default();
        config.render.default_tab = "matches".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("default_tab"));
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("medswap.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_catalog_includes_extras() {
        let mut config = Config::default();
        config.catalog.extra_medicines = vec!["Ibuprofen 200mg".to_string()];
        config.catalog.max_suggestions = 1;

        let catalog = config.catalog();
        assert_eq!(catalog.len(), 9);
        assert_eq!(catalog.suggest("ibu"), vec!["Ibuprofen 200mg"]);
        assert_eq!(catalog.suggest("mg").len(), 1);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("medswap"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("medswap_config_{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[storage]\nslot_key = \"clinic_a\"\n\n[catalog]\nextra_medicines = [\"Ibuprofen 200mg\"]\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.storage.slot_key, "clinic_a");
        assert_eq!(config.catalog.extra_medicines, vec!["Ibuprofen 200mg"]);
        assert_eq!(config.render, RenderConfig::default());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path =
            std::env::temp_dir().join(format!("medswap_bad_config_{}.toml", std::process::id()));
        std::fs::write(&path, "[catalog]\nmax_suggestions = 0\n").unwrap();

        let err = Config::load_from(Some(path.clone())).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("slot_key"));
        assert!(json.contains("coordinate_precision"));
    }
}
