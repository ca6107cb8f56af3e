//! Init handshake
//!
//! The engine calls [`initialization_callback`] synchronously from inside
//! `libgodot_create_godot_instance`, handing over its `get_proc_address`.
//! The callback carries no user context, so `create()` arms a thread-local
//! capture slot right before the native call and drains it right after.

use std::cell::RefCell;
use std::ffi::c_void;
use tracing::{debug, error, warn};

use super::interface::ExtensionInterface;
use super::method_bind::{MethodBind, MethodBindCache, MethodKey};
use crate::error::{HostError, InitError};
use crate::ffi::{
    ClassLibraryPtr, GDExtensionBool, GetProcAddressFn, Initialization, InitializationLevel,
    GDEXTENSION_FALSE, GDEXTENSION_TRUE, INITIALIZATION_CORE,
};

/// Interface table plus the binds resolved against it.
#[derive(Debug, Clone, Copy)]
pub struct Bindings {
    pub interface: ExtensionInterface,
    pub binds: MethodBindCache,
}

impl Bindings {
    /// Interface table and cached bind for `key`, if both are available.
    pub(crate) fn lookup(
        bindings: Option<&Self>,
        key: MethodKey,
    ) -> Result<(&ExtensionInterface, &MethodBind), HostError> {
        let bindings = bindings.ok_or_else(|| key.unavailable())?;
        Ok((&bindings.interface, bindings.binds.get(&key)?))
    }
}

/// What happened during one native create call.
#[derive(Debug)]
pub(crate) enum InitOutcome {
    /// The engine never invoked the init callback.
    NotCalled,
    /// The callback ran but the library already held resolved bindings.
    Reused,
    Resolved(Bindings),
    Failed(InitError),
}

struct Capture {
    resolve: bool,
    outcome: InitOutcome,
}

thread_local! {
    static CAPTURE: RefCell<Option<Capture>> = const { RefCell::new(None) };
}

/// Armed capture slot for the duration of one native create call.
pub(crate) struct CaptureGuard {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl CaptureGuard {
    /// Arm the slot. With `resolve == false` the callback skips table and
    /// bind resolution.
    pub(crate) fn arm(resolve: bool) -> Self {
        CAPTURE.with(|slot| {
            *slot.borrow_mut() = Some(Capture {
                resolve,
                outcome: InitOutcome::NotCalled,
            });
        });
        Self {
            _not_send: std::marker::PhantomData,
        }
    }

    pub(crate) fn finish(self) -> InitOutcome {
        CAPTURE.with(|slot| slot.borrow_mut().take())
            .map_or(InitOutcome::NotCalled, |capture| capture.outcome)
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        CAPTURE.with(|slot| {
            if let Ok(mut slot) = slot.try_borrow_mut() {
                slot.take();
            }
        });
    }
}

unsafe extern "C" fn initialize_level(_userdata: *mut c_void, level: InitializationLevel) {
    debug!(level, "Engine entered initialization level");
}

unsafe extern "C" fn deinitialize_level(_userdata: *mut c_void, level: InitializationLevel) {
    debug!(level, "Engine left initialization level");
}

/// GDExtension init function passed to the engine's create entry point.
///
/// Populates the interface table first and the bind cache second, both
/// inside this single synchronous invocation.
pub(crate) unsafe extern "C" fn initialization_callback(
    get_proc_address: Option<GetProcAddressFn>,
    _library: ClassLibraryPtr,
    r_initialization: *mut Initialization,
) -> GDExtensionBool {
    if !r_initialization.is_null() {
        r_initialization.write(Initialization {
            minimum_initialization_level: INITIALIZATION_CORE,
            userdata: std::ptr::null_mut(),
            initialize: Some(initialize_level),
            deinitialize: Some(deinitialize_level),
        });
    }

    let resolve = CAPTURE.with(|slot| {
        slot.try_borrow()
            .ok()
            .and_then(|slot| slot.as_ref().map(|capture| capture.resolve))
    });

    let Some(resolve) = resolve else {
        warn!("Init callback invoked outside of engine creation, ignoring");
        return GDEXTENSION_FALSE;
    };

    let outcome = if !resolve {
        debug!("Interface table already resolved, reusing");
        InitOutcome::Reused
    } else {
        match get_proc_address {
            None => InitOutcome::Failed(InitError::MissingProcAddress),
            Some(get_proc_address) => match ExtensionInterface::load(get_proc_address) {
                Ok(interface) => InitOutcome::Resolved(Bindings {
                    interface,
                    binds: MethodBindCache::resolve(Some(&interface)),
                }),
                Err(e) => InitOutcome::Failed(e),
            },
        }
    };

    let ok = !matches!(outcome, InitOutcome::Failed(_));
    if let InitOutcome::Failed(e) = &outcome {
        error!(error = %e, "Engine initialization handshake failed");
    }

    CAPTURE.with(|slot| {
        if let Ok(mut slot) = slot.try_borrow_mut() {
            if let Some(capture) = slot.as_mut() {
                capture.outcome = outcome;
            }
        }
    });

    if ok {
        GDEXTENSION_TRUE
    } else {
        GDEXTENSION_FALSE
    }
}
