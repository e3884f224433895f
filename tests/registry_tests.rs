use marmot::models::resolve;
use marmot::validation::{validate, CheckOptions, RecordingReporter};
use marmot::{
    Diagnostic, EntryPoint, FactoryError, Kwargs, Marmot, MarmotError, Model, ModelError, ModelId,
    NotFoundError, PluginModule, Registry,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Adds the numbers of its input array
struct Add;

impl Model for Add {
    fn dummy_input(&self) -> Option<Value> {
        Some(json!([1, 2]))
    }
    fn dummy_output(&self) -> Option<Value> {
        Some(json!(3))
    }
    fn get_output(&self, input: &Value) -> Result<Value, ModelError> {
        let items = input
            .as_array()
            .ok_or_else(|| ModelError::InvalidInput("expected an array".to_string()))?;
        Ok(json!(items.iter().filter_map(Value::as_i64).sum::<i64>()))
    }
}

/// Returns a fixed tag so tests can tell factories apart
struct Tagged(&'static str);

impl Model for Tagged {
    fn dummy_input(&self) -> Option<Value> {
        Some(Value::Null)
    }
    fn dummy_output(&self) -> Option<Value> {
        Some(json!(self.0))
    }
    fn get_output(&self, _input: &Value) -> Result<Value, ModelError> {
        Ok(json!(self.0))
    }
}

struct Unimplemented;

impl Model for Unimplemented {
    fn dummy_input(&self) -> Option<Value> {
        Some(json!(1))
    }
    fn dummy_output(&self) -> Option<Value> {
        Some(json!(1))
    }
}

fn add() -> EntryPoint {
    EntryPoint::factory(|_| Ok::<Box<dyn Model>, FactoryError>(Box::new(Add)))
}

fn tagged(tag: &'static str) -> EntryPoint {
    EntryPoint::factory(move |_| Ok::<Box<dyn Model>, FactoryError>(Box::new(Tagged(tag))))
}

#[test]
fn test_unversioned_model_loads_and_runs() {
    let mut marmot = Marmot::new();
    marmot.register("sum", add(), Kwargs::new()).unwrap();

    let model = marmot.load("sum", Kwargs::new()).unwrap();
    assert_eq!(model.get_output(&json!([2, 3])).unwrap(), json!(5));
}

#[test]
fn test_versioned_then_unversioned_conflicts() {
    let mut registry = Registry::new();
    registry.register("m-v1", tagged("f1"), Kwargs::new()).unwrap();

    let result = registry.register("m", tagged("f2"), Kwargs::new());
    assert!(matches!(result, Err(MarmotError::VersionConflict { .. })));
    assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["m-v1"]);
}

#[test]
fn test_unversioned_then_versioned_conflicts() {
    let mut registry = Registry::new();
    registry.register("ns/m", tagged("f1"), Kwargs::new()).unwrap();

    let result = registry.register("ns/m-v3", tagged("f2"), Kwargs::new());
    assert!(matches!(result, Err(MarmotError::VersionConflict { .. })));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_omitted_version_loads_latest() {
    let mut marmot = Marmot::new();
    marmot.register("m-v1", tagged("f1"), Kwargs::new()).unwrap();
    marmot.register("m-v2", tagged("f2"), Kwargs::new()).unwrap();

    let model = marmot.load("m", Kwargs::new()).unwrap();
    assert_eq!(model.id(), "m-v2");
    assert_eq!(model.get_output(&Value::Null).unwrap(), json!("f2"));

    let resolution = resolve(marmot.registry(), "m").unwrap();
    assert_eq!(
        resolution.diagnostics,
        vec![Diagnostic::SubstitutedLatest {
            requested: "m".to_string(),
            resolved: "m-v2".to_string(),
        }]
    );
}

#[test]
fn test_not_implemented_is_reported_not_raised() {
    let mut marmot = Marmot::new();
    marmot
        .register(
            "stub",
            EntryPoint::factory(|_| Ok::<Box<dyn Model>, FactoryError>(Box::new(Unimplemented))),
            Kwargs::new(),
        )
        .unwrap();

    let model = marmot.load("stub", Kwargs::new()).unwrap();
    let mut reporter = RecordingReporter::default();

    assert!(!validate(&model, CheckOptions::default(), &mut reporter));
    assert!(reporter.outcomes.iter().any(|o| !o.passed));
}

#[test]
fn test_identifier_round_trip() {
    let namespaces = [None, Some("fuel"), Some("a:b-c")];
    let names = ["spread", "rate.of-spread", "x"];
    let versions = [None, Some(0), Some(7), Some(120)];

    for ns in namespaces {
        for name in names {
            for version in versions {
                let id = ModelId::new(ns, name, version);
                assert_eq!(ModelId::parse(&id.to_string()).unwrap(), id, "{id}");
            }
        }
    }
}

#[test]
fn test_highest_version() {
    let mut registry = Registry::new();
    assert_eq!(registry.find_highest_version(Some("fuel"), "spread"), None);

    for id in ["fuel/spread-v2", "fuel/spread-v10", "fuel/spread-v1"] {
        registry.register(id, add(), Kwargs::new()).unwrap();
    }
    registry.register("fuel/moisture", add(), Kwargs::new()).unwrap();

    assert_eq!(registry.find_highest_version(Some("fuel"), "spread"), Some(10));
    assert_eq!(registry.find_highest_version(Some("fuel"), "moisture"), None);
}

#[test]
fn test_namespace_suggestion_threshold() {
    let mut registry = Registry::new();
    registry.register("fuel/spread-v1", add(), Kwargs::new()).unwrap();

    match resolve(&registry, "fuell/spread-v1") {
        Err(MarmotError::NotFound(NotFoundError::Namespace { suggestion, .. })) => {
            assert_eq!(suggestion.as_deref(), Some("fuel"));
        }
        other => panic!("expected a namespace diagnosis, got {other:?}"),
    }

    match resolve(&registry, "weather/spread-v1") {
        Err(MarmotError::NotFound(NotFoundError::Namespace { suggestion, .. })) => {
            assert_eq!(suggestion, None);
        }
        other => panic!("expected a namespace diagnosis, got {other:?}"),
    }
}

#[test]
fn test_reference_entry_point_missing_attribute() {
    let mut marmot = Marmot::new();
    marmot.add_module(
        "arith",
        PluginModule::new().with_factory("add", |_| Ok::<Box<dyn Model>, FactoryError>(Box::new(Add))),
    );

    marmot
        .register("missing", EntryPoint::reference("arith:subtract"), Kwargs::new())
        .unwrap();
    assert!(matches!(
        marmot.load("missing", Kwargs::new()),
        Err(MarmotError::EntryPointNotFound { .. })
    ));

    marmot
        .register("present", EntryPoint::reference("arith:add"), Kwargs::new())
        .unwrap();
    assert!(marmot.load("present", Kwargs::new()).is_ok());

    marmot.register("direct", add(), Kwargs::new()).unwrap();
    assert!(marmot.load("direct", Kwargs::new()).is_ok());
}

#[test]
fn test_module_prefix_imports_once() {
    let imports = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&imports);

    let mut marmot = Marmot::new();
    marmot.add_module(
        "weather",
        PluginModule::new().with_register(move |registry| {
            counter.fetch_add(1, Ordering::SeqCst);
            registry
                .register("weather/wind-v1", tagged("wind"), Kwargs::new())
                .map(|_| ())
        }),
    );

    let first = marmot.find_spec("weather:weather/wind").unwrap();
    assert_eq!(first.spec.id(), "weather/wind-v1");

    let second = marmot.find_spec("weather:weather/wind-v1").unwrap();
    assert_eq!(second.spec.id(), "weather/wind-v1");
    assert_eq!(imports.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unknown_module_prefix() {
    let mut marmot = Marmot::new();
    assert!(matches!(
        marmot.find_spec("nowhere:m-v1"),
        Err(MarmotError::ModuleLoad { .. })
    ));
}
