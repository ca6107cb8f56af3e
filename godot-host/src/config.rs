//! Host configuration
//!
//! Everything the embedding host needs before touching the engine: where the
//! library lives, which directory the engine's .NET bootstrap should load
//! assemblies from, and the argument vector passed through to the engine.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HostError, Result};

/// Environment variable the engine's managed-hosting bootstrap reads.
pub const DEFAULT_ASSEMBLY_DIR_VAR: &str = "GODOT_DOTNET_ASSEMBLY_DIR";

/// Configuration for one embedded engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Path to the engine shared library (default: searched next to the executable)
    pub library_path: Option<PathBuf>,
    /// Directory holding the managed assemblies (default: executable directory)
    pub assembly_dir: Option<PathBuf>,
    /// Name of the environment variable carrying `assembly_dir`
    pub assembly_dir_var: String,
    /// `argv[0]` handed to the engine
    pub app_name: String,
    /// Project directory passed with `--path`
    pub project: Option<PathBuf>,
    /// Pass `--headless`
    pub headless: bool,
    /// Extra arguments appended verbatim
    pub extra_args: Vec<String>,
    /// Stop pumping after this many frames
    pub max_frames: Option<u64>,
    /// Stop pumping after this many seconds
    pub max_seconds: Option<f64>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            assembly_dir: None,
            assembly_dir_var: DEFAULT_ASSEMBLY_DIR_VAR.to_string(),
            app_name: env!("CARGO_PKG_NAME").to_string(),
            project: None,
            headless: false,
            extra_args: Vec::new(),
            max_frames: None,
            max_seconds: None,
        }
    }
}

impl HostConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Ordered argument vector for the engine's create entry point.
    ///
    /// `[app_name, "--path", <project>, "--headless", extra...]`, omitting
    /// the parts that are not configured.
    pub fn engine_args(&self) -> Vec<String> {
        let mut args = vec![self.app_name.clone()];
        if let Some(project) = &self.project {
            args.push("--path".to_string());
            args.push(project.to_string_lossy().into_owned());
        }
        if self.headless {
            args.push("--headless".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// The configured assembly directory, or the running executable's directory.
    pub fn resolve_assembly_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.assembly_dir {
            return Ok(dir.clone());
        }

        let exe = std::env::current_exe()
            .map_err(|e| HostError::InvalidArgument(format!("cannot locate executable: {}", e)))?;
        exe.parent().map(Path::to_path_buf).ok_or_else(|| {
            HostError::InvalidArgument(format!("executable {:?} has no parent", exe))
        })
    }

    /// `max_seconds` as a `Duration`. Negative, NaN and out-of-range values
    /// mean no time budget.
    pub fn time_budget(&self) -> Option<Duration> {
        self.max_seconds.and_then(|s| Duration::try_from_secs_f64(s).ok())
    }
}
