use crate::error::ModelError;
use crate::models::spec::ModelSpec;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Capability set every registrable model must expose
///
/// `get_output` receives a single JSON value; positional arguments are passed as
/// an array and "no arguments" as `Value::Null`. Implementations that have not
/// filled in `get_output` inherit the default, which reports `NotImplemented`.
pub trait Model {
    /// Sample input used by the contract checker
    fn dummy_input(&self) -> Option<Value>;

    /// Expected output for `dummy_input` (declared, never compared)
    fn dummy_output(&self) -> Option<Value>;

    /// Produce output for `input`
    fn get_output(&self, _input: &Value) -> Result<Value, ModelError> {
        Err(ModelError::NotImplemented("get_output".to_string()))
    }
}

/// A model instance produced by the loader, stamped with its resolved spec
pub struct LoadedModel {
    spec: Arc<ModelSpec>,
    model: Box<dyn Model>,
}

impl LoadedModel {
    pub(crate) fn new(spec: ModelSpec, model: Box<dyn Model>) -> Self {
        Self {
            spec: Arc::new(spec),
            model,
        }
    }

    /// Spec this instance was created from
    #[must_use]
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    #[must_use]
    pub fn id(&self) -> &str {
        self.spec.id()
    }

    #[must_use]
    pub fn dummy_input(&self) -> Option<Value> {
        self.model.dummy_input()
    }

    #[must_use]
    pub fn dummy_output(&self) -> Option<Value> {
        self.model.dummy_output()
    }

    /// Produce output for `input`
    ///
    /// # Errors
    /// Propagates whatever the underlying model reports.
    pub fn get_output(&self, input: &Value) -> Result<Value, ModelError> {
        self.model.get_output(input)
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("spec", &self.spec)
            .field("model", &"dyn Model { ... }")
            .finish()
    }
}
