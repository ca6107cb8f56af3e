//! Engine Lifecycle Handle
//!
//! Owns the native engine instance and walks it through
//! `Uninitialized -> Starting -> Running -> Disposed`.
//!
//! The engine supports a single instance per process. That limit is held by
//! an [`EngineRegistry`]: every transition into `Starting` is a
//! check-and-set under the registry lock, and `dispose()` clears the slot
//! under the same lock. [`EngineRegistry::global`] is the process-wide
//! registry; tests build their own to stay independent.
//!
//! Resolved bindings belong to the [`EngineLibrary`] they were resolved
//! against, never to the registry, so a reloaded library cannot be called
//! through pointers into an unloaded one.
//!
//! # Threading
//! [`Engine`] and [`InstancePump`](super::InstancePump) are `!Send`: the
//! engine's frame loop is single-threaded by contract, so the handle lives
//! and dies on the thread that created it.

use std::cell::Cell;
use std::ffi::{c_void, CString};
use std::os::raw::{c_char, c_int};
use std::ptr::NonNull;
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, error, info, warn};

use super::init::{initialization_callback, Bindings, CaptureGuard, InitOutcome};
use super::method_bind::GODOT_INSTANCE_START;
use super::pump::InstancePump;
use crate::environment;
use crate::error::{HostError, Result};
use crate::ffi::GDObjectInstanceID;
use crate::library::EngineLibrary;

/// Lifecycle state of an engine handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    Uninitialized,
    Starting,
    Running,
    Disposed,
}

/// Guards the one-live-instance limit.
#[derive(Debug, Default)]
pub struct EngineRegistry {
    live: Mutex<bool>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<EngineRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Self::new())).clone()
    }

    /// Whether an engine instance is currently live
    pub fn is_live(&self) -> bool {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        *self.lock() = false;
    }
}

/// Owned, NUL-terminated argument vector for the create entry point.
struct CArgs {
    _owned: Vec<CString>,
    ptrs: Vec<*mut c_char>,
}

impl CArgs {
    fn new<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let owned = args
            .into_iter()
            .map(|arg| {
                CString::new(arg.as_ref()).map_err(|_| {
                    HostError::InvalidArgument(format!("argument {:?} contains NUL", arg.as_ref()))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut ptrs: Vec<*mut c_char> = owned.iter().map(|arg| arg.as_ptr().cast_mut()).collect();
        ptrs.push(std::ptr::null_mut());

        Ok(Self {
            _owned: owned,
            ptrs,
        })
    }

    fn argc(&self) -> Result<c_int> {
        c_int::try_from(self.ptrs.len() - 1)
            .map_err(|_| HostError::InvalidArgument("too many arguments".to_string()))
    }

    fn argv(&mut self) -> *mut *mut c_char {
        self.ptrs.as_mut_ptr()
    }
}

/// State shared between an [`Engine`] and its pump handles.
#[derive(Debug)]
pub(crate) struct InstanceCell {
    pub(crate) state: Cell<EngineState>,
    pub(crate) instance: Cell<Option<NonNull<c_void>>>,
}

/// Handle owning one native engine instance
pub struct Engine {
    registry: Arc<EngineRegistry>,
    library: Arc<EngineLibrary>,
    bindings: Option<Bindings>,
    cell: Rc<InstanceCell>,
}

impl Engine {
    /// Create the native engine instance.
    ///
    /// `args` is passed through verbatim; conventionally an application name
    /// followed by engine flags such as `--path <dir>` and `--headless`.
    ///
    /// Fails with `AlreadyRunning` if `registry` already has a live instance.
    /// The engine calls back into the init handshake from inside this call;
    /// a failed handshake destroys the fresh instance before returning.
    pub fn create<I, S>(
        registry: &Arc<EngineRegistry>,
        library: Arc<EngineLibrary>,
        args: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut argv = CArgs::new(args)?;
        let argc = argv.argc()?;

        let mut live = registry.lock();
        if *live {
            warn!("Refusing to create a second engine instance");
            return Err(HostError::AlreadyRunning);
        }

        if !environment::is_bootstrapped() {
            warn!(
                "Environment bootstrap has not run; the engine will not see the assembly directory"
            );
        }

        let cell = Rc::new(InstanceCell {
            state: Cell::new(EngineState::Uninitialized),
            instance: Cell::new(None),
        });

        info!(argc, "Creating native engine instance");
        let guard = CaptureGuard::arm(!library.is_resolved());
        let raw = unsafe { library.create_instance(argc, argv.argv(), initialization_callback) };
        let outcome = guard.finish();

        // A failed handshake is reported even when the instance is null.
        let bindings = match outcome {
            InitOutcome::Resolved(resolved) => Some(*library.bindings().get_or_init(|| resolved)),
            InitOutcome::Reused => library.bindings().get().copied(),
            InitOutcome::NotCalled => {
                warn!("Engine never ran the init handshake; method binds unavailable");
                None
            }
            InitOutcome::Failed(e) => {
                if let Some(instance) = NonNull::new(raw) {
                    unsafe { library.destroy_instance(instance.as_ptr()) };
                }
                return Err(e.into());
            }
        };

        let Some(instance) = NonNull::new(raw) else {
            error!("Native engine creation returned null");
            return Err(HostError::NativeCreate);
        };

        cell.instance.set(Some(instance));
        cell.state.set(EngineState::Starting);
        *live = true;
        drop(live);

        info!("Engine instance created");
        Ok(Self {
            registry: registry.clone(),
            library,
            bindings,
            cell,
        })
    }

    /// Run the engine's `start` bind.
    ///
    /// If the engine refuses to start, the instance is destroyed and the
    /// registry slot released before `NativeStart` is returned.
    pub fn start(&mut self) -> Result<()> {
        let state = self.state();
        if state != EngineState::Starting {
            return Err(HostError::InvalidState {
                operation: "start",
                state,
            });
        }

        let (interface, bind) = Bindings::lookup(self.bindings.as_ref(), GODOT_INSTANCE_START)?;
        let instance = self.cell.instance.get().ok_or(HostError::InvalidState {
            operation: "start",
            state,
        })?;

        info!("Starting engine");
        let started = unsafe { bind.call_bool(interface, instance) };
        if !started {
            error!("Engine refused to start, tearing down instance");
            self.teardown();
            return Err(HostError::NativeStart);
        }

        self.cell.state.set(EngineState::Running);
        info!("Engine running");
        Ok(())
    }

    /// Destroy the native instance and release the registry slot.
    ///
    /// Idempotent: only the first call from `Starting` or `Running` reaches
    /// the native destroy entry point.
    pub fn dispose(&mut self) {
        match self.state() {
            EngineState::Starting | EngineState::Running => {
                self.teardown();
                info!("Engine disposed");
            }
            EngineState::Uninitialized => self.cell.state.set(EngineState::Disposed),
            EngineState::Disposed => debug!("Engine already disposed"),
        }
    }

    fn teardown(&mut self) {
        // Pumps observe this before the pointer goes away.
        self.cell.state.set(EngineState::Disposed);
        if let Some(instance) = self.cell.instance.take() {
            unsafe { self.library.destroy_instance(instance.as_ptr()) };
        }
        self.registry.release();
    }

    /// A non-owning handle for per-frame iteration.
    pub fn pump(&self) -> InstancePump {
        InstancePump::new(self.cell.clone(), self.bindings)
    }

    pub fn state(&self) -> EngineState {
        self.cell.state.get()
    }

    /// Engine-side object identifier of the instance.
    pub fn instance_id(&self) -> Result<GDObjectInstanceID> {
        let state = self.state();
        let instance = self.cell.instance.get().ok_or(HostError::InvalidState {
            operation: "instance_id",
            state,
        })?;
        let bindings = self.bindings.as_ref().ok_or(HostError::InterfaceUnavailable)?;
        Ok(unsafe { bindings.interface.instance_id(instance.as_ptr()) })
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state())
            .field("library", &self.library)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_starts_empty() {
        let registry = EngineRegistry::new();
        assert!(!registry.is_live());
    }

    #[test]
    fn test_registry_release() {
        let registry = EngineRegistry::new();
        *registry.lock() = true;
        assert!(registry.is_live());
        registry.release();
        assert!(!registry.is_live());
    }

    #[test]
    fn test_global_registry_is_shared() {
        assert!(Arc::ptr_eq(&EngineRegistry::global(), &EngineRegistry::global()));
    }

    #[test]
    fn test_cargs_layout() {
        let mut args = CArgs::new(["app", "--headless"]).unwrap();
        assert_eq!(args.argc().unwrap(), 2);
        let argv = args.argv();
        unsafe {
            assert_eq!(std::ffi::CStr::from_ptr(*argv).to_str().unwrap(), "app");
            assert_eq!(std::ffi::CStr::from_ptr(*argv.add(1)).to_str().unwrap(), "--headless");
            assert!((*argv.add(2)).is_null());
        }
    }

    #[test]
    fn test_cargs_rejects_nul() {
        assert!(matches!(
            CArgs::new(["bad\0arg"]),
            Err(HostError::InvalidArgument(_))
        ));
    }
}
