use thiserror::Error;

/// Main error type for marmot
#[derive(Error, Debug)]
pub enum MarmotError {
    #[error("Malformed model ID: {0}\n\nExpected format: [namespace/]name[-vVERSION]")]
    MalformedIdentifier(String),

    #[error("Cannot register `{attempted}` when `{existing}` of the same name already exists\n\nTroubleshooting:\n- A model family is either unversioned or versioned, never both\n- Add a version suffix (e.g. -v1) to every member, or drop it from all of them")]
    VersionConflict { attempted: String, existing: String },

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("Model registration via module `{module}` failed: {reason}\n\nTroubleshooting:\n- Check whether '{module}' contains model registration and is added to the plugin table")]
    ModuleLoad { module: String, reason: String },

    #[error("Entry point `{entry_point}` not found: {reason}")]
    EntryPointNotFound { entry_point: String, reason: String },

    #[error("{source} was raised from the model creator for {id} with kwargs ({kwargs})")]
    ModelCreation {
        id: String,
        kwargs: String,
        #[source]
        source: FactoryError,
    },

    #[error("Model `{id}` does not satisfy the model contract: missing {}", join_missing(.missing))]
    ContractViolation {
        id: String,
        missing: Vec<&'static str>,
    },

    #[error("Environment provisioning failed: {0}\n\nTroubleshooting:\n- Is cargo installed and in PATH?\n- Set validation.cargo in config or MARMOT_CARGO to point at it")]
    EnvironmentProvision(String),

    #[error("Dependency installation failed ({step}):\n{output}")]
    DependencyInstall { step: String, output: String },

    #[error("Validation execution error: {0}")]
    ValidationExecution(String),

    #[error("Packaging error: {0}")]
    Package(String),

    #[error("Model store error: {0}\n\nTroubleshooting:\n- Check network connection\n- Verify store.base_url in config or MARMOT_STORE_URL")]
    Store(String),

    #[error("Config error: {0}\n\nTroubleshooting:\n- Check config file: ~/.config/marmot/config.toml\n- Run with RUST_LOG=debug for more details")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Layered diagnosis produced when an identifier does not resolve
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Namespace {namespace} not found. {}", namespace_hint(.namespace, .suggestion))]
    Namespace {
        namespace: String,
        suggestion: Option<String>,
    },

    #[error("Model `{name}` does not exist{}.{}", in_namespace(.namespace), did_you_mean(.suggestion))]
    Name {
        namespace: Option<String>,
        name: String,
        suggestion: Option<String>,
    },

    #[error("Model version `v{version}` for model `{model}` does not exist.{}{}", default_hint(.default), versions_hint(.versions))]
    Version {
        model: String,
        version: u32,
        versions: Vec<u32>,
        default: Option<String>,
    },

    #[error("No registered model with id: {id}. Did you register it, or import the module that registers it?")]
    Unregistered { id: String },
}

/// Failure raised by a model factory while constructing a model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),
}

/// Failure raised by a model while producing output
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("`{0}` function not defined")]
    NotImplemented(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Failed(String),
}

fn join_missing(missing: &[&'static str]) -> String {
    missing.join(", ")
}

fn namespace_hint(namespace: &str, suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!("Did you mean: `{s}`?"),
        None => format!("Have you installed the proper package for {namespace}?"),
    }
}

fn in_namespace(namespace: &Option<String>) -> String {
    namespace
        .as_ref()
        .map(|ns| format!(" in namespace {ns}"))
        .unwrap_or_default()
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" Did you mean: `{s}`?"))
        .unwrap_or_default()
}

fn default_hint(default: &Option<String>) -> String {
    default
        .as_ref()
        .map(|d| format!(" It provides the default version `{d}`."))
        .unwrap_or_default()
}

fn versions_hint(versions: &[u32]) -> String {
    if versions.is_empty() {
        return String::new();
    }
    let listed: Vec<String> = versions.iter().map(|v| format!("`v{v}`")).collect();
    format!(" It provides versioned models: [ {} ].", listed.join(", "))
}

pub type Result<T> = std::result::Result<T, MarmotError>;
