//! Project and library discovery helpers

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{HostError, Result};

/// Marker file every engine project directory contains.
pub const PROJECT_FILE: &str = "project.godot";

/// Platform file name of the engine library (`libgodot.so`, `godot.dll`, ...).
pub fn default_library_name() -> String {
    libloading::library_filename("godot")
        .to_string_lossy()
        .into_owned()
}

/// Canonicalize `path` and check that it is an engine project directory.
pub fn validate_project_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let dir = path
        .canonicalize()
        .map_err(|e| HostError::InvalidArgument(format!("project directory {:?}: {}", path, e)))?;

    if !dir.join(PROJECT_FILE).is_file() {
        return Err(HostError::InvalidArgument(format!(
            "no {} found in {:?}",
            PROJECT_FILE, dir
        )));
    }

    debug!(project = ?dir, "Project directory validated");
    Ok(dir)
}

/// Directories searched for the engine library, in order.
pub fn library_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("."), PathBuf::from("./bin")];
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        paths.push(dir);
    }
    paths
}

/// First `name` found in `search_paths`.
pub fn locate_library(search_paths: &[PathBuf], name: &str) -> Option<PathBuf> {
    search_paths
        .iter()
        .map(|dir| dir.join(name))
        .find(|candidate| {
            debug!(candidate = ?candidate, "Probing for engine library");
            candidate.is_file()
        })
}
