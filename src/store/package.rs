//! Candidate archives
//!
//! A candidate directory is zipped recursively with every entry prefixed by the
//! directory's own name, so extracting the archive recreates that directory.

use crate::error::{MarmotError, Result};
use crate::validation::runner::{TMP_DIR, VALIDATION_ENV_DIR};
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const SKIPPED_DIRS: &[&str] = &["target", "__pycache__", ".git", TMP_DIR, VALIDATION_ENV_DIR];
const SKIPPED_EXTENSIONS: &[&str] = &["pyc", "rlib", "rmeta", "o"];

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

fn is_skipped_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SKIPPED_EXTENSIONS.contains(&ext))
}

/// Name of a candidate directory, used as archive name and entry prefix
pub fn candidate_name(candidate_dir: &Path) -> Result<String> {
    let dir = candidate_dir.canonicalize()?;
    dir.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            MarmotError::Package(format!("Cannot derive a name from {}", dir.display()))
        })
}

/// Zip `candidate_dir` into `<tmp_dir>/<name>.zip`
pub fn package(candidate_dir: &Path, tmp_dir: &Path) -> Result<PathBuf> {
    let root = candidate_dir.canonicalize()?;
    let name = candidate_name(&root)?;

    fs::create_dir_all(tmp_dir)?;
    let archive_path = tmp_dir.join(format!("{name}.zip"));
    tracing::info!("Packaging {} into {}", root.display(), archive_path.display());

    let mut writer = ZipWriter::new(File::create(&archive_path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(&root)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
    {
        let entry = entry.map_err(|e| MarmotError::Package(format!("Failed to walk candidate: {e}")))?;
        let relative = entry
            .path()
            .strip_prefix(&root)
            .map_err(|e| MarmotError::Package(e.to_string()))?;

        let mut entry_name = name.clone();
        for component in relative.components() {
            entry_name.push('/');
            entry_name.push_str(&component.as_os_str().to_string_lossy());
        }

        if entry.file_type().is_dir() {
            writer
                .add_directory(entry_name, options)
                .map_err(|e| MarmotError::Package(format!("Failed to add directory: {e}")))?;
        } else if entry.file_type().is_file() && !is_skipped_file(entry.path()) {
            writer
                .start_file(entry_name, options)
                .map_err(|e| MarmotError::Package(format!("Failed to add file: {e}")))?;
            io::copy(&mut File::open(entry.path())?, &mut writer)?;
        }
    }

    writer
        .finish()
        .map_err(|e| MarmotError::Package(format!("Failed to finish archive: {e}")))?;

    Ok(archive_path)
}

/// Extract a zip archive held in memory into `dest_dir`
///
/// Entries whose names would escape `dest_dir` are skipped.
pub fn extract(bytes: &[u8], dest_dir: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| MarmotError::Package(format!("Failed to read zip archive: {e}")))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| MarmotError::Package(format!("Failed to read zip entry {i}: {e}")))?;

        let Some(outpath) = file.enclosed_name().map(|path| dest_dir.join(path)) else {
            continue;
        };

        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            io::copy(&mut file, &mut outfile)?;
        }
    }

    Ok(())
}
