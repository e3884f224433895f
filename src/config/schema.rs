use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct StoreConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ValidationConfig {
    /// Directory holding the scratch environment (defaults to the current directory)
    pub work_dir: Option<PathBuf>,
    /// Cargo binary used to build the check harness (defaults to `cargo` on PATH)
    pub cargo: Option<PathBuf>,
    /// Registry version of the runtime installed into the harness
    pub runtime_version: Option<String>,
    pub runtime_git: Option<String>,
    pub runtime_path: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct RegistryConfig {
    #[serde(default = "default_suggestion_distance")]
    pub suggestion_distance: usize,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_suggestion_distance() -> usize {
    crate::models::registry::DEFAULT_SUGGESTION_DISTANCE
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            suggestion_distance: default_suggestion_distance(),
        }
    }
}
