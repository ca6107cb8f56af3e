//! Environment Bridge
//!
//! The engine's .NET hosting bootstrap reads the assembly directory straight
//! from the OS environment during `libgodot_create_godot_instance`, not
//! through the host's own view of it. The value is therefore written to every
//! layer that may be consulted:
//! - the host process view (`std::env`)
//! - the C runtime environment on POSIX (`setenv`)
//! - the wide-string C runtime environment on Windows (`_wputenv_s`)
//!
//! [`bootstrap`] must run before the first native call, ideally before any
//! other thread is spawned.

use std::ffi::{OsStr, OsString};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::config::HostConfig;
use crate::error::{HostError, Result};

static BOOTSTRAPPED: AtomicBool = AtomicBool::new(false);

/// One layer of the environment a value must reach.
pub trait EnvSink: Send + Sync {
    /// Short label used in logs and errors
    fn name(&self) -> &'static str;

    /// Set `key` to `value`, overwriting any previous value.
    fn set(&self, key: &str, value: &OsStr) -> Result<()>;
}

/// The host process view of the environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSink for ProcessEnv {
    fn name(&self) -> &'static str {
        "process"
    }

    fn set(&self, key: &str, value: &OsStr) -> Result<()> {
        std::env::set_var(key, value);
        Ok(())
    }
}

/// The C runtime environment, written with `setenv(3)`.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixEnv;

#[cfg(unix)]
impl EnvSink for PosixEnv {
    fn name(&self) -> &'static str {
        "setenv"
    }

    fn set(&self, key: &str, value: &OsStr) -> Result<()> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let fail = |reason: String| HostError::Environment {
            name: key.to_string(),
            sink: self.name(),
            reason,
        };

        let c_key = CString::new(key).map_err(|e| fail(e.to_string()))?;
        let c_value = CString::new(value.as_bytes()).map_err(|e| fail(e.to_string()))?;

        // overwrite = 1
        let rc = unsafe { libc::setenv(c_key.as_ptr(), c_value.as_ptr(), 1) };
        if rc == 0 {
            Ok(())
        } else {
            Err(fail(std::io::Error::last_os_error().to_string()))
        }
    }
}

#[cfg(windows)]
extern "C" {
    // UCRT wide-string environment setter
    fn _wputenv_s(name: *const u16, value: *const u16) -> std::os::raw::c_int;
}

/// The C runtime environment on Windows, written with `_wputenv_s`.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct WideEnv;

#[cfg(windows)]
impl EnvSink for WideEnv {
    fn name(&self) -> &'static str {
        "_wputenv_s"
    }

    fn set(&self, key: &str, value: &OsStr) -> Result<()> {
        use std::os::windows::ffi::OsStrExt;

        let wide = |s: &OsStr| s.encode_wide().chain(std::iter::once(0)).collect::<Vec<u16>>();
        let w_key = wide(OsStr::new(key));
        let w_value = wide(value);

        let rc = unsafe { _wputenv_s(w_key.as_ptr(), w_value.as_ptr()) };
        if rc == 0 {
            Ok(())
        } else {
            Err(HostError::Environment {
                name: key.to_string(),
                sink: self.name(),
                reason: format!("errno {}", rc),
            })
        }
    }
}

/// Writes a value to every configured environment layer, in order.
pub struct EnvironmentBridge {
    sinks: Vec<Box<dyn EnvSink>>,
}

impl EnvironmentBridge {
    /// Host view first, then the platform's native setter.
    pub fn platform() -> Self {
        let mut sinks: Vec<Box<dyn EnvSink>> = vec![Box::new(ProcessEnv)];
        #[cfg(unix)]
        sinks.push(Box::new(PosixEnv));
        #[cfg(windows)]
        sinks.push(Box::new(WideEnv));
        Self { sinks }
    }

    pub fn with_sinks(sinks: Vec<Box<dyn EnvSink>>) -> Self {
        Self { sinks }
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Set `name` to `value` in every layer. Later calls overwrite earlier ones.
    ///
    /// The name and value are validated before any layer is touched.
    pub fn propagate(&self, name: &str, value: impl AsRef<OsStr>) -> Result<()> {
        let value = value.as_ref();
        validate(name, value)?;

        for sink in &self.sinks {
            sink.set(name, value)?;
            debug!(name, sink = sink.name(), "Environment variable set");
        }

        info!(name, value = %value.to_string_lossy(), "Environment propagated");
        Ok(())
    }
}

impl Default for EnvironmentBridge {
    fn default() -> Self {
        Self::platform()
    }
}

fn validate(name: &str, value: &OsStr) -> Result<()> {
    let invalid = |reason: &str| HostError::Environment {
        name: name.to_string(),
        sink: "validation",
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains('=') || name.contains('\0') {
        return Err(invalid("name contains '=' or NUL"));
    }
    if value.to_string_lossy().contains('\0') {
        return Err(invalid("value contains NUL"));
    }
    Ok(())
}

/// Propagate the configured assembly directory to every environment layer.
///
/// Precondition: runs before the first native engine call. Returns the
/// directory that was published.
pub fn bootstrap(config: &HostConfig) -> Result<OsString> {
    bootstrap_with(&EnvironmentBridge::platform(), config)
}

/// [`bootstrap`] through a caller-supplied bridge.
pub fn bootstrap_with(bridge: &EnvironmentBridge, config: &HostConfig) -> Result<OsString> {
    let dir = config.resolve_assembly_dir()?;
    bridge.propagate(&config.assembly_dir_var, &dir)?;
    BOOTSTRAPPED.store(true, Ordering::Release);
    Ok(dir.into_os_string())
}

/// Whether [`bootstrap`] has completed in this process.
pub fn is_bootstrapped() -> bool {
    BOOTSTRAPPED.load(Ordering::Acquire)
}
