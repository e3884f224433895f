//! Typed `module:attribute` adapter
//!
//! A plugin module is a name bound at startup to an optional registration hook
//! and a table of named factories. Importing a module runs its hook once, which
//! is how a `module:model-id` request populates the registry. Entry points given
//! as `module:attribute` strings are looked up in the same table.

use crate::error::{FactoryError, MarmotError, Result};
use crate::models::model::Model;
use crate::models::registry::Registry;
use crate::models::spec::{Factory, Kwargs};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Registration hook run when a module is imported
pub type RegisterHook = Arc<dyn Fn(&mut Registry) -> Result<()> + Send + Sync>;

/// Loader for modules and `module:attribute` entry points
pub trait PluginLoader {
    /// Import `module`, running its registration side effects against `registry`
    ///
    /// # Errors
    /// `ModuleLoad` if the module is unknown or its registration fails.
    fn import(&mut self, module: &str, registry: &mut Registry) -> Result<()>;

    /// Resolve a `module:attribute` reference to a factory
    ///
    /// # Errors
    /// `EntryPointNotFound` if the reference is malformed or either part is missing.
    fn entry_point(&self, reference: &str) -> Result<Factory>;
}

/// A named module: registration hook plus exported factories
#[derive(Clone, Default)]
pub struct PluginModule {
    hook: Option<RegisterHook>,
    factories: HashMap<String, Factory>,
}

impl PluginModule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hook run on import
    #[must_use]
    pub fn with_register<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Registry) -> Result<()> + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Export a factory under `attribute`
    #[must_use]
    pub fn with_factory<F>(mut self, attribute: &str, factory: F) -> Self
    where
        F: Fn(&Kwargs) -> std::result::Result<Box<dyn Model>, FactoryError> + Send + Sync + 'static,
    {
        self.factories.insert(attribute.to_string(), Arc::new(factory));
        self
    }
}

/// Table of plugin modules populated at startup
#[derive(Clone, Default)]
pub struct PluginTable {
    modules: HashMap<String, PluginModule>,
    imported: HashSet<String>,
}

impl PluginTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a module
    pub fn add_module(&mut self, name: &str, module: PluginModule) {
        self.imported.remove(name);
        self.modules.insert(name.to_string(), module);
    }

    #[must_use]
    pub fn is_imported(&self, module: &str) -> bool {
        self.imported.contains(module)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

impl fmt::Debug for PluginTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.module_names().collect();
        names.sort_unstable();
        f.debug_struct("PluginTable").field("modules", &names).finish()
    }
}

impl PluginLoader for PluginTable {
    fn import(&mut self, module: &str, registry: &mut Registry) -> Result<()> {
        if self.imported.contains(module) {
            return Ok(());
        }

        let plugin = self.modules.get(module).ok_or_else(|| MarmotError::ModuleLoad {
            module: module.to_string(),
            reason: format!("no module named '{module}'"),
        })?;

        if let Some(hook) = &plugin.hook {
            hook(registry).map_err(|e| MarmotError::ModuleLoad {
                module: module.to_string(),
                reason: e.to_string(),
            })?;
        }

        tracing::debug!("Imported module {module}");
        self.imported.insert(module.to_string());
        Ok(())
    }

    fn entry_point(&self, reference: &str) -> Result<Factory> {
        let not_found = |reason: String| MarmotError::EntryPointNotFound {
            entry_point: reference.to_string(),
            reason,
        };

        let (module, attribute) = reference
            .split_once(':')
            .ok_or_else(|| not_found("expected `module:attribute`".to_string()))?;

        let plugin = self
            .modules
            .get(module)
            .ok_or_else(|| not_found(format!("no module named '{module}'")))?;

        plugin
            .factories
            .get(attribute)
            .cloned()
            .ok_or_else(|| not_found(format!("module '{module}' has no attribute '{attribute}'")))
    }
}
