use crate::error::{MarmotError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Result of one capability check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckOutcome {
    pub check: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckOutcome {
    pub fn pass(check: &str, detail: impl Into<String>) -> Self {
        Self {
            check: check.to_string(),
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(check: &str, detail: impl Into<String>) -> Self {
        Self {
            check: check.to_string(),
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Checks run against one registered model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelReport {
    pub id: String,
    pub loaded: bool,
    pub error: Option<String>,
    pub checks: Vec<CheckOutcome>,
}

impl ModelReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.loaded && self.checks.iter().all(|c| c.passed)
    }
}

/// Status record written by the check harness and read back by the runner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationStatus {
    pub passed: bool,
    pub module_error: Option<String>,
    pub models: Vec<ModelReport>,
    pub finished_at: String,
}

impl ValidationStatus {
    /// Status for a batch of model reports
    #[must_use]
    pub fn from_reports(models: Vec<ModelReport>) -> Self {
        Self {
            passed: models.iter().all(ModelReport::passed),
            module_error: None,
            models,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Status for a candidate whose registration failed
    #[must_use]
    pub fn module_failure(error: impl Into<String>) -> Self {
        Self {
            passed: false,
            module_error: Some(error.into()),
            models: Vec::new(),
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Ids of models that failed loading or a check
    #[must_use]
    pub fn failed_models(&self) -> Vec<&str> {
        self.models
            .iter()
            .filter(|m| !m.passed())
            .map(|m| m.id.as_str())
            .collect()
    }

    /// Load a status record
    ///
    /// # Errors
    /// `ValidationExecution` if the record is missing or unreadable.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MarmotError::ValidationExecution(format!(
                "No status record at {}: {e}",
                path.display()
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            MarmotError::ValidationExecution(format!("Failed to parse status record: {e}"))
        })
    }

    /// Save status record atomically (tmp + rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            MarmotError::ValidationExecution(format!("Failed to serialize status record: {e}"))
        })?;

        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, path)?;

        Ok(())
    }
}
