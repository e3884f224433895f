use crate::error::{MarmotError, Result};
use crate::models::model::LoadedModel;
use crate::models::plugins::PluginLoader;
use crate::models::registry::{missing_capabilities, Registry};
use crate::models::resolver::find_spec;
use crate::models::spec::{EntryPoint, Kwargs, ModelSpec};
use std::sync::Arc;

/// What to load: an identifier to resolve, or a spec used as is
#[derive(Debug, Clone)]
pub enum LoadTarget {
    Id(String),
    Spec(Arc<ModelSpec>),
}

impl From<&str> for LoadTarget {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for LoadTarget {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<Arc<ModelSpec>> for LoadTarget {
    fn from(spec: Arc<ModelSpec>) -> Self {
        Self::Spec(spec)
    }
}

impl From<ModelSpec> for LoadTarget {
    fn from(spec: ModelSpec) -> Self {
        Self::Spec(Arc::new(spec))
    }
}

/// Instantiate a model, merging `overrides` over the spec's stored kwargs
///
/// The registry's spec is never mutated; the returned model carries a fresh copy.
///
/// # Errors
/// - resolution errors (`MalformedIdentifier`, `NotFound`, `ModuleLoad`)
/// - `EntryPointNotFound` if a string entry point cannot be resolved
/// - `ModelCreation` if the factory fails, wrapping the factory's own error
/// - `ContractViolation` if the instance lacks part of the capability set
pub fn load(
    registry: &mut Registry,
    plugins: &mut dyn PluginLoader,
    target: impl Into<LoadTarget>,
    overrides: Kwargs,
) -> Result<LoadedModel> {
    let spec = match target.into() {
        LoadTarget::Spec(spec) => spec,
        LoadTarget::Id(id) => find_spec(registry, plugins, &id)?.spec,
    };

    let mut kwargs = spec.kwargs().clone();
    kwargs.extend(overrides);

    let factory = match spec.entry_point() {
        EntryPoint::Factory(factory) => Arc::clone(factory),
        EntryPoint::Reference(reference) => plugins.entry_point(reference)?,
    };

    let model = factory(&kwargs).map_err(|source| MarmotError::ModelCreation {
        id: spec.id().to_string(),
        kwargs: serde_json::Value::Object(kwargs.clone()).to_string(),
        source,
    })?;

    let missing = missing_capabilities(model.as_ref());
    if !missing.is_empty() {
        return Err(MarmotError::ContractViolation {
            id: spec.id().to_string(),
            missing,
        });
    }

    tracing::debug!("Loaded model {}", spec.id());
    Ok(LoadedModel::new(ModelSpec::clone(&spec), model))
}
