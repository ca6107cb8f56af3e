//! Engine library loading
//!
//! Opens the prebuilt engine shared library with libloading and resolves its
//! two exported entry points. The `Library` is kept alive for as long as any
//! engine handle holds the `EngineLibrary`, so the entry points never dangle.
//!
//! The interface table and method binds resolved during the init handshake
//! point into this library, so they are cached here and nowhere else. A
//! freshly loaded library always resolves its own.

use libloading::{Library, Symbol};
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::engine::Bindings;
use crate::error::{HostError, InitError, Result};
use crate::ffi::{
    CreateInstanceFn, DestroyInstanceFn, InitializationFunction, ObjectPtr,
    CREATE_INSTANCE_SYMBOL, DESTROY_INSTANCE_SYMBOL,
};

/// The engine's create and destroy entry points.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoints {
    pub create: CreateInstanceFn,
    pub destroy: DestroyInstanceFn,
}

/// A loaded engine library
pub struct EngineLibrary {
    entry: EntryPoints,
    path: Option<PathBuf>,
    bindings: OnceLock<Bindings>,
    /// Kept alive to prevent symbol unloading
    _library: Option<Library>,
}

impl EngineLibrary {
    /// Load the engine from a shared library on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading engine library from {:?}", path);

        let library = unsafe { Library::new(path) }.map_err(|source| HostError::Library {
            path: path.to_path_buf(),
            source,
        })?;

        let entry = unsafe {
            EntryPoints {
                create: Self::symbol::<CreateInstanceFn>(&library, CREATE_INSTANCE_SYMBOL)?,
                destroy: Self::symbol::<DestroyInstanceFn>(&library, DESTROY_INSTANCE_SYMBOL)?,
            }
        };

        info!("Engine library loaded successfully");
        Ok(Self {
            entry,
            path: Some(path.to_path_buf()),
            bindings: OnceLock::new(),
            _library: Some(library),
        })
    }

    /// Wrap entry points that are already linked into the process.
    ///
    /// # Safety
    /// Both functions must follow the engine's create/destroy contract and
    /// stay callable for the lifetime of the returned value.
    pub unsafe fn from_entry_points(entry: EntryPoints) -> Self {
        Self {
            entry,
            path: None,
            bindings: OnceLock::new(),
            _library: None,
        }
    }

    /// Path the library was loaded from, if it came from disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the init handshake has resolved bindings against this library
    pub fn is_resolved(&self) -> bool {
        self.bindings.get().is_some()
    }

    /// Resolved bindings, kept for the lifetime of the library.
    pub(crate) fn bindings(&self) -> &OnceLock<Bindings> {
        &self.bindings
    }

    unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T> {
        let symbol: Symbol<T> = library.get(name).map_err(|e| {
            debug!("Symbol lookup failed: {}", e);
            InitError::SymbolNotFound(String::from_utf8_lossy(name).into_owned())
        })?;
        Ok(*symbol)
    }

    pub(crate) unsafe fn create_instance(
        &self,
        argc: c_int,
        argv: *mut *mut c_char,
        init: InitializationFunction,
    ) -> ObjectPtr {
        (self.entry.create)(argc, argv, init)
    }

    pub(crate) unsafe fn destroy_instance(&self, instance: ObjectPtr) {
        (self.entry.destroy)(instance)
    }
}

impl std::fmt::Debug for EngineLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineLibrary")
            .field("path", &self.path)
            .field("resolved", &self.is_resolved())
            .finish_non_exhaustive()
    }
}
