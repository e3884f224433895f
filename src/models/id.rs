use crate::error::{MarmotError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Identifier grammar: optional `namespace/`, non-greedy name, optional `-vN`
static MODEL_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<namespace>[\w:-]+)/)?(?P<name>[\w:.-]+?)(?:-v(?P<version>\d+))?$")
        .expect("model id pattern is valid")
});

/// Structured model identifier `[namespace/]name[-vVERSION]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId {
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<u32>,
}

impl ModelId {
    #[must_use]
    pub fn new(namespace: Option<&str>, name: &str, version: Option<u32>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
            version,
        }
    }

    /// Parse an identifier string
    ///
    /// # Errors
    /// Returns `MalformedIdentifier` when the string does not fully match the grammar
    /// or the version does not fit in a `u32`.
    pub fn parse(id: &str) -> Result<Self> {
        let caps = MODEL_ID_PATTERN
            .captures(id)
            .ok_or_else(|| MarmotError::MalformedIdentifier(id.to_string()))?;

        let version = caps
            .name("version")
            .map(|v| v.as_str().parse::<u32>())
            .transpose()
            .map_err(|_| MarmotError::MalformedIdentifier(id.to_string()))?;

        Ok(Self {
            namespace: caps.name("namespace").map(|m| m.as_str().to_string()),
            name: caps["name"].to_string(),
            version,
        })
    }

    /// Same identifier with a different version
    #[must_use]
    pub fn with_version(&self, version: Option<u32>) -> Self {
        Self {
            version,
            ..self.clone()
        }
    }

    /// `[namespace/]name` without the version suffix
    #[must_use]
    pub fn unversioned(&self) -> Self {
        self.with_version(None)
    }
}

/// Format identifier components, omitting absent parts
#[must_use]
pub fn format_id(namespace: Option<&str>, name: &str, version: Option<u32>) -> String {
    let mut full = match namespace {
        Some(ns) => format!("{ns}/{name}"),
        None => name.to_string(),
    };
    if let Some(v) = version {
        full.push_str(&format!("-v{v}"));
    }
    full
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_id(
            self.namespace.as_deref(),
            &self.name,
            self.version,
        ))
    }
}

impl FromStr for ModelId {
    type Err = MarmotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
