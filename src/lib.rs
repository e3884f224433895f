//! Model registry with isolated validation and distribution to a model store
//!
//! Model crates register factories under identifiers of the form
//! `[namespace/]name[-vVERSION]` and are loaded back by identifier. The
//! `validation` module checks a candidate crate inside a disposable cargo
//! environment before `store` packages and uploads it.

pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod store;
pub mod validation;

pub use context::Marmot;
pub use error::{FactoryError, MarmotError, ModelError, NotFoundError, Result};
pub use models::{
    Diagnostic, EntryPoint, Kwargs, LoadedModel, Model, ModelId, ModelSpec, PluginModule,
    Registry,
};
