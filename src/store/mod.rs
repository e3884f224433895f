//! Packaging, upload and download of model crates

pub mod client;
pub mod package;

pub use client::{Categories, HttpModelStore, ModelStore};

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Directory that fetched modules are extracted into
pub const MODELS_DIR: &str = ".marmot-models";

/// Package `candidate_dir` into `tmp_dir` and upload it under its directory name
///
/// Returns the name the candidate was published under.
pub async fn publish(store: &dyn ModelStore, candidate_dir: &Path, tmp_dir: &Path) -> Result<String> {
    let name = package::candidate_name(candidate_dir)?;
    let archive_path = package::package(candidate_dir, tmp_dir)?;

    if let Err(e) = store.upload(&name, &archive_path).await {
        tracing::error!("Upload of {name} failed: {e}");
        return Err(e);
    }

    tracing::info!("Published {name}");
    Ok(name)
}

/// Local directory a fetched module lands in
#[must_use]
pub fn module_dir(dest_root: &Path, module: &str) -> PathBuf {
    dest_root.join(MODELS_DIR).join(module.replace('#', "__"))
}

/// Download a module archive and extract it under `<dest_root>/.marmot-models`
pub async fn fetch_module(store: &dyn ModelStore, module: &str, dest_root: &Path) -> Result<PathBuf> {
    let bytes = store.download(module).await?;
    let dest = module_dir(dest_root, module);
    package::extract(&bytes, &dest)?;

    tracing::info!("Fetched {module} into {}", dest.display());
    Ok(dest)
}
