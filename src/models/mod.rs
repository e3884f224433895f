pub mod id;
pub mod loader;
pub mod model;
pub mod plugins;
pub mod registry;
pub mod resolver;
pub mod spec;

pub use id::ModelId;
pub use loader::{load, LoadTarget};
pub use model::{LoadedModel, Model};
pub use plugins::{PluginLoader, PluginModule, PluginTable};
pub use registry::{Diagnostic, Registration, Registry};
pub use resolver::{find_spec, resolve, Resolution};
pub use spec::{EntryPoint, Factory, Kwargs, ModelSpec};
