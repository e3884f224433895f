//! Configuration module for marmot
//!
//! Loads config from `$XDG_CONFIG_HOME/marmot/config.toml` or the platform
//! config directory. Falls back to defaults if the file doesn't exist.
//! Partial configs are merged with defaults using serde's default attributes.
//! `MARMOT_STORE_URL` and `MARMOT_CARGO` override the file.
//!
//! # Example
//!
//! ```no_run
//! use marmot::config::Config;
//!
//! let config = Config::load().expect("Failed to load config");
//! println!("Store: {}", config.store.base_url);
//! ```

pub mod schema;

pub use schema::Config;

use crate::error::{MarmotError, Result};
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Load config from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            MarmotError::Config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Default config file location
    #[must_use]
    pub fn path() -> Option<PathBuf> {
        let base = match std::env::var_os("XDG_CONFIG_HOME") {
            Some(xdg_config) => Some(PathBuf::from(xdg_config)),
            None => dirs::config_dir(),
        };
        base.map(|dir| dir.join("marmot").join("config.toml"))
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("MARMOT_STORE_URL") {
            self.store.base_url = url;
        }
        if let Some(cargo) = std::env::var_os("MARMOT_CARGO") {
            self.validation.cargo = Some(PathBuf::from(cargo));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        std::env::remove_var("MARMOT_STORE_URL");
        std::env::remove_var("MARMOT_CARGO");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.base_url, "http://localhost:8000");
        assert_eq!(config.store.timeout_secs, 120);
        assert_eq!(config.registry.suggestion_distance, 2);
        assert!(config.validation.cargo.is_none());
    }

    #[test]
    fn test_partial_config_merges_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[store]\nbase_url = \"https://models.example.org\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.store.base_url, "https://models.example.org");
        assert_eq!(config.store.timeout_secs, 120);
        assert_eq!(config.registry.suggestion_distance, 2);
    }

    #[test]
    fn test_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[store\nbase_url = 1").unwrap();

        assert!(matches!(Config::load_from(&path), Err(MarmotError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_load_from_xdg_with_env_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().join("marmot");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("config.toml"),
            "[validation]\nruntime_version = \"0.1.0\"\n\n[registry]\nsuggestion_distance = 3\n",
        )
        .unwrap();

        clear_env();
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        std::env::set_var("MARMOT_STORE_URL", "http://store.test");
        std::env::set_var("MARMOT_CARGO", "/opt/cargo/bin/cargo");

        let config = Config::load().unwrap();
        clear_env();
        std::env::remove_var("XDG_CONFIG_HOME");

        assert_eq!(config.store.base_url, "http://store.test");
        assert_eq!(config.validation.runtime_version.as_deref(), Some("0.1.0"));
        assert_eq!(
            config.validation.cargo,
            Some(PathBuf::from("/opt/cargo/bin/cargo"))
        );
        assert_eq!(config.registry.suggestion_distance, 3);
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        clear_env();
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());

        let config = Config::load().unwrap();
        std::env::remove_var("XDG_CONFIG_HOME");

        assert_eq!(config.store.base_url, "http://localhost:8000");
    }
}
