use crate::config::schema::RegistryConfig;
use crate::error::Result;
use crate::models::loader::{self, LoadTarget};
use crate::models::model::LoadedModel;
use crate::models::plugins::{PluginModule, PluginTable};
use crate::models::registry::{Registration, Registry};
use crate::models::resolver::{self, Resolution};
use crate::models::spec::{EntryPoint, Kwargs};
use crate::validation::checker::{self, CheckOptions, ConsoleReporter};

/// Process-wide context owning the model registry and the plugin table
///
/// Registration is expected to happen up front, followed by read-mostly lookups.
/// Nothing here is synchronised; share it across threads only behind your own lock.
#[derive(Debug, Default)]
pub struct Marmot {
    registry: Registry,
    plugins: PluginTable,
}

impl Marmot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            plugins: PluginTable::new(),
        }
    }

    /// Context whose registry uses the configured suggestion distance
    #[must_use]
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::with_registry(Registry::new().with_suggestion_distance(config.suggestion_distance))
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Make a module available to `module:model-id` lookups and string entry points
    pub fn add_module(&mut self, name: &str, module: PluginModule) {
        self.plugins.add_module(name, module);
    }

    /// Register a spec in the owned registry
    ///
    /// # Errors
    /// See [`Registry::register`].
    pub fn register(&mut self, id: &str, entry_point: EntryPoint, kwargs: Kwargs) -> Result<Registration> {
        self.registry.register(id, entry_point, kwargs)
    }

    /// Resolve an identifier, importing a `module:` prefix first
    ///
    /// # Errors
    /// See [`resolver::find_spec`].
    pub fn find_spec(&mut self, id: &str) -> Result<Resolution> {
        resolver::find_spec(&mut self.registry, &mut self.plugins, id)
    }

    /// Load a model by id or spec
    ///
    /// # Errors
    /// See [`loader::load`].
    pub fn load(&mut self, target: impl Into<LoadTarget>, overrides: Kwargs) -> Result<LoadedModel> {
        loader::load(&mut self.registry, &mut self.plugins, target, overrides)
    }

    /// Load and check a single model, printing the outcome
    ///
    /// A model that fails to load counts as invalid.
    pub fn validate(&mut self, target: impl Into<LoadTarget>) -> bool {
        match self.load(target, Kwargs::new()) {
            Ok(model) => checker::validate(&model, CheckOptions::default(), &mut ConsoleReporter),
            Err(e) => {
                tracing::warn!("Cannot load model: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FactoryError, MarmotError, ModelError};
    use crate::models::model::Model;
    use serde_json::{json, Value};

    #[derive(Default)]
    struct Sum;

    impl Model for Sum {
        fn dummy_input(&self) -> Option<Value> {
            Some(json!([1, 2]))
        }
        fn dummy_output(&self) -> Option<Value> {
            Some(json!(3))
        }
        fn get_output(&self, input: &Value) -> std::result::Result<Value, ModelError> {
            let items = input
                .as_array()
                .ok_or_else(|| ModelError::InvalidInput("expected an array".to_string()))?;
            Ok(json!(items.iter().filter_map(Value::as_i64).sum::<i64>()))
        }
    }

    #[test]
    fn test_isolated_registries() {
        let mut a = Marmot::new();
        let b = Marmot::new();
        a.registry_mut().register_model::<Sum>("sum").unwrap();
        assert_eq!(a.registry().len(), 1);
        assert!(b.registry().is_empty());
    }

    #[test]
    fn test_module_prefixed_load() {
        let mut marmot = Marmot::new();
        marmot.add_module(
            "arith",
            PluginModule::new()
                .with_register(|registry| {
                    registry
                        .register("arith/sum-v1", EntryPoint::reference("arith:sum"), Kwargs::new())
                        .map(|_| ())
                })
                .with_factory("sum", |_| Ok::<Box<dyn Model>, FactoryError>(Box::new(Sum))),
        );

        let model = marmot.load("arith:arith/sum", Kwargs::new()).unwrap();
        assert_eq!(model.id(), "arith/sum-v1");
        assert_eq!(model.get_output(&json!([2, 3])).unwrap(), json!(5));
    }

    #[test]
    fn test_validate_single_model() {
        let mut marmot = Marmot::new();
        marmot.registry_mut().register_model::<Sum>("sum").unwrap();
        assert!(marmot.validate("sum"));
        assert!(!marmot.validate("missing"));
    }

    #[test]
    fn test_from_config_sets_suggestion_distance() {
        let marmot = Marmot::from_config(&RegistryConfig {
            suggestion_distance: 4,
        });
        assert_eq!(marmot.registry().suggestion_distance(), 4);
    }

    #[test]
    fn test_find_spec_reports_not_found() {
        let mut marmot = Marmot::new();
        assert!(matches!(
            marmot.find_spec("nothing"),
            Err(MarmotError::NotFound(_))
        ));
    }
}
