use crate::error::{NotFoundError, Result};
use crate::models::id::ModelId;
use crate::models::plugins::PluginLoader;
use crate::models::registry::{Diagnostic, Registry};
use crate::models::spec::ModelSpec;
use std::sync::Arc;

/// A resolved spec together with the diagnostics emitted on the way
#[derive(Debug, Clone)]
pub struct Resolution {
    pub spec: Arc<ModelSpec>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolve a possibly partial identifier against `registry`
///
/// An id of the form `module:model-id` first imports `module` through `plugins`.
///
/// # Errors
/// - `ModuleLoad` if the module prefix cannot be imported
/// - `MalformedIdentifier` if the id does not parse
/// - `NotFound` with the most specific diagnosis available
pub fn find_spec(
    registry: &mut Registry,
    plugins: &mut dyn PluginLoader,
    id: &str,
) -> Result<Resolution> {
    let model_id = match id.split_once(':') {
        Some((module, model_id)) => {
            plugins.import(module, registry)?;
            model_id
        }
        None => id,
    };

    resolve(registry, model_id)
}

/// Resolve an identifier without any module import
///
/// # Errors
/// `MalformedIdentifier` or `NotFound`.
pub fn resolve(registry: &Registry, id: &str) -> Result<Resolution> {
    let requested = ModelId::parse(id)?;
    let mut target = requested.clone();
    let mut diagnostics = Vec::new();

    if requested.version.is_none() {
        if let Some(latest) =
            registry.find_highest_version(requested.namespace.as_deref(), &requested.name)
        {
            target = requested.with_version(Some(latest));
            let diagnostic = Diagnostic::SubstitutedLatest {
                requested: requested.to_string(),
                resolved: target.to_string(),
            };
            tracing::warn!("{diagnostic}");
            diagnostics.push(diagnostic);
        }
    }

    match registry.lookup(&target.to_string()) {
        Some(spec) => Ok(Resolution { spec, diagnostics }),
        None => Err(diagnose(registry, &target).into()),
    }
}

/// Build the most specific not-found diagnosis for `id`
fn diagnose(registry: &Registry, id: &ModelId) -> NotFoundError {
    let namespace = id.namespace.as_deref();

    if let Some(ns) = namespace {
        let namespaces = registry.namespaces();
        if !namespaces.contains(ns) {
            return NotFoundError::Namespace {
                namespace: ns.to_string(),
                suggestion: registry.suggest(ns, namespaces.iter().copied()),
            };
        }
    }

    let names = registry.names_in(namespace);
    if !names.contains(id.name.as_str()) {
        return NotFoundError::Name {
            namespace: id.namespace.clone(),
            name: id.name.clone(),
            suggestion: registry.suggest(&id.name, names.iter().copied()),
        };
    }

    if let Some(version) = id.version {
        let family = registry.family(namespace, &id.name);
        return NotFoundError::Version {
            model: id.unversioned().to_string(),
            version,
            versions: family.iter().filter_map(|s| s.version()).collect(),
            default: family
                .iter()
                .find(|s| s.version().is_none())
                .map(|s| s.id().to_string()),
        };
    }

    NotFoundError::Unregistered { id: id.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FactoryError, MarmotError};
    use crate::models::model::Model;
    use crate::models::plugins::{PluginModule, PluginTable};
    use crate::models::spec::{EntryPoint, Kwargs};
    use serde_json::Value;

    struct Null;

    impl Model for Null {
        fn dummy_input(&self) -> Option<Value> {
            Some(Value::Null)
        }
        fn dummy_output(&self) -> Option<Value> {
            Some(Value::Null)
        }
    }

    fn null() -> EntryPoint {
        EntryPoint::factory(|_| Ok::<Box<dyn Model>, FactoryError>(Box::new(Null)))
    }

    fn registry_with(ids: &[&str]) -> Registry {
        let mut registry = Registry::new();
        for id in ids {
            registry.register(id, null(), Kwargs::new()).unwrap();
        }
        registry
    }

    fn not_found(result: Result<Resolution>) -> NotFoundError {
        match result {
            Err(MarmotError::NotFound(e)) => e,
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(r) => panic!("unexpectedly resolved to {}", r.spec.id()),
        }
    }

    #[test]
    fn test_resolve_exact() {
        let registry = registry_with(&["math/add-v1", "sum"]);
        let resolution = resolve(&registry, "math/add-v1").unwrap();
        assert_eq!(resolution.spec.id(), "math/add-v1");
        assert!(resolution.diagnostics.is_empty());

        let resolution = resolve(&registry, "sum").unwrap();
        assert_eq!(resolution.spec.id(), "sum");
        assert!(resolution.diagnostics.is_empty());
    }

    #[test]
    fn test_omitted_version_resolves_latest() {
        let registry = registry_with(&["m-v1", "m-v3", "m-v2"]);
        let resolution = resolve(&registry, "m").unwrap();
        assert_eq!(resolution.spec.id(), "m-v3");
        assert_eq!(
            resolution.diagnostics,
            vec![Diagnostic::SubstitutedLatest {
                requested: "m".to_string(),
                resolved: "m-v3".to_string(),
            }]
        );
    }

    #[test]
    fn test_unknown_namespace_with_suggestion() {
        let registry = registry_with(&["math/add"]);
        assert_eq!(
            not_found(resolve(&registry, "mathh/add")),
            NotFoundError::Namespace {
                namespace: "mathh".to_string(),
                suggestion: Some("math".to_string()),
            }
        );
    }

    #[test]
    fn test_unknown_namespace_without_suggestion() {
        let registry = registry_with(&["math/add"]);
        assert_eq!(
            not_found(resolve(&registry, "biology/add")),
            NotFoundError::Namespace {
                namespace: "biology".to_string(),
                suggestion: None,
            }
        );
    }

    #[test]
    fn test_unknown_name_with_suggestion() {
        let registry = registry_with(&["math/add", "math/multiply"]);
        assert_eq!(
            not_found(resolve(&registry, "math/ad")),
            NotFoundError::Name {
                namespace: Some("math".to_string()),
                name: "ad".to_string(),
                suggestion: Some("add".to_string()),
            }
        );
    }

    #[test]
    fn test_unknown_name_without_namespace() {
        let registry = registry_with(&["sum"]);
        assert_eq!(
            not_found(resolve(&registry, "product")),
            NotFoundError::Name {
                namespace: None,
                name: "product".to_string(),
                suggestion: None,
            }
        );
    }

    #[test]
    fn test_missing_version_lists_known_versions() {
        let registry = registry_with(&["m-v1", "m-v2"]);
        assert_eq!(
            not_found(resolve(&registry, "m-v7")),
            NotFoundError::Version {
                model: "m".to_string(),
                version: 7,
                versions: vec![1, 2],
                default: None,
            }
        );
    }

    #[test]
    fn test_missing_version_notes_default() {
        let registry = registry_with(&["ns/m"]);
        assert_eq!(
            not_found(resolve(&registry, "ns/m-v1")),
            NotFoundError::Version {
                model: "ns/m".to_string(),
                version: 1,
                versions: vec![],
                default: Some("ns/m".to_string()),
            }
        );
    }

    #[test]
    fn test_malformed_id() {
        let registry = Registry::new();
        assert!(matches!(
            resolve(&registry, "a b"),
            Err(MarmotError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn test_module_prefix_imports_before_resolving() {
        let mut plugins = PluginTable::new();
        plugins.add_module(
            "arith",
            PluginModule::new().with_register(|registry| {
                registry
                    .register("add-v1", null(), Kwargs::new())
                    .map(|_| ())
            }),
        );

        let mut registry = Registry::new();
        let resolution = find_spec(&mut registry, &mut plugins, "arith:add").unwrap();
        assert_eq!(resolution.spec.id(), "add-v1");
    }

    #[test]
    fn test_module_prefix_failure_is_module_load() {
        let mut plugins = PluginTable::new();
        let mut registry = Registry::new();
        let err = find_spec(&mut registry, &mut plugins, "nowhere:add").unwrap_err();
        assert!(matches!(err, MarmotError::ModuleLoad { .. }));
    }
}
