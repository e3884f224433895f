use crate::error::{FactoryError, Result};
use crate::models::id::ModelId;
use crate::models::model::Model;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Model initialisation arguments
pub type Kwargs = Map<String, Value>;

/// Constructor closure registered for a model id
pub type Factory = Arc<dyn Fn(&Kwargs) -> std::result::Result<Box<dyn Model>, FactoryError> + Send + Sync>;

/// How a spec produces model instances
#[derive(Clone)]
pub enum EntryPoint {
    /// Constructor closure, used directly
    Factory(Factory),
    /// `module:attribute` reference resolved through the plugin loader
    Reference(String),
}

impl EntryPoint {
    /// Wrap a closure as an entry point
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&Kwargs) -> std::result::Result<Box<dyn Model>, FactoryError> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(f))
    }

    pub fn reference(reference: impl Into<String>) -> Self {
        Self::Reference(reference.into())
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Factory(_) => f.write_str("Factory(..)"),
            Self::Reference(r) => f.debug_tuple("Reference").field(r).finish(),
        }
    }
}

/// Registry record binding an identifier to its entry point and default arguments
///
/// The identifier components are derived once at construction and never change.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    id: String,
    model_id: ModelId,
    entry_point: EntryPoint,
    kwargs: Kwargs,
}

impl ModelSpec {
    /// Build a spec, deriving namespace, name and version from `id`
    ///
    /// # Errors
    /// Returns `MalformedIdentifier` if `id` does not parse.
    pub fn new(id: &str, entry_point: EntryPoint, kwargs: Kwargs) -> Result<Self> {
        let model_id = ModelId::parse(id)?;
        Ok(Self {
            id: model_id.to_string(),
            model_id,
            entry_point,
            kwargs,
        })
    }

    /// Canonical identifier string
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn model_id(&self) -> &ModelId {
        &self.model_id
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.model_id.namespace.as_deref()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.model_id.name
    }

    #[must_use]
    pub fn version(&self) -> Option<u32> {
        self.model_id.version
    }

    #[must_use]
    pub fn entry_point(&self) -> &EntryPoint {
        &self.entry_point
    }

    #[must_use]
    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    /// Whether this spec belongs to the (namespace, name) family
    #[must_use]
    pub fn same_family(&self, namespace: Option<&str>, name: &str) -> bool {
        self.namespace() == namespace && self.name() == name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spec_derives_components() {
        let spec = ModelSpec::new("math/add-v2", EntryPoint::reference("arith:add"), Kwargs::new())
            .unwrap();
        assert_eq!(spec.id(), "math/add-v2");
        assert_eq!(spec.namespace(), Some("math"));
        assert_eq!(spec.name(), "add");
        assert_eq!(spec.version(), Some(2));
        assert!(spec.same_family(Some("math"), "add"));
        assert!(!spec.same_family(None, "add"));
    }

    #[test]
    fn test_spec_rejects_malformed_id() {
        assert!(ModelSpec::new("a b", EntryPoint::reference("m:a"), Kwargs::new()).is_err());
    }

    #[test]
    fn test_clone_is_deep_for_kwargs() {
        let mut kwargs = Kwargs::new();
        kwargs.insert("weights".to_string(), json!({"a": [1, 2]}));
        let spec = ModelSpec::new("m", EntryPoint::reference("m:a"), kwargs).unwrap();

        let mut copy = spec.kwargs().clone();
        copy["weights"]["a"][0] = json!(99);

        assert_eq!(spec.kwargs()["weights"]["a"][0], json!(1));
    }
}
