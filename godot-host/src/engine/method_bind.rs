//! Method Bind Cache
//!
//! Reflection lookups by name are slow, so the binds the hot path needs are
//! resolved once during the init handshake and then called through a single
//! pointer indirection.

use std::ffi::{c_void, CStr};
use std::ptr::NonNull;
use tracing::{debug, warn};

use super::interface::ExtensionInterface;
use crate::error::HostError;
use crate::ffi::{ConstTypePtr, GDEXTENSION_FALSE};

/// Signature fingerprint of a non-const, argument-less method returning `bool`.
pub const BOOL_NO_ARGS_HASH: i64 = 2240911060;

/// The (type, method, fingerprint) triple a bind is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub class: &'static CStr,
    pub method: &'static CStr,
    pub hash: i64,
}

impl MethodKey {
    pub const fn new(class: &'static CStr, method: &'static CStr, hash: i64) -> Self {
        Self { class, method, hash }
    }

    pub fn class_name(&self) -> &'static str {
        self.class.to_str().unwrap_or("<non-utf8>")
    }

    pub fn method_name(&self) -> &'static str {
        self.method.to_str().unwrap_or("<non-utf8>")
    }

    pub(crate) fn unavailable(&self) -> HostError {
        HostError::BindUnavailable {
            class: self.class_name(),
            method: self.method_name(),
        }
    }
}

/// `GodotInstance::start() -> bool`
pub const GODOT_INSTANCE_START: MethodKey =
    MethodKey::new(c"GodotInstance", c"start", BOOL_NO_ARGS_HASH);

/// `GodotInstance::iteration() -> bool`
pub const GODOT_INSTANCE_ITERATION: MethodKey =
    MethodKey::new(c"GodotInstance", c"iteration", BOOL_NO_ARGS_HASH);

/// Scratch space the engine writes a ptrcall return value into.
#[repr(C, align(8))]
struct ReturnBuf([u8; 16]);

/// A resolved, callable method bind.
///
/// The fingerprint is pinned in `key` at resolution time; the bind is only
/// ever invoked with the shape that fingerprint describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodBind {
    key: MethodKey,
    ptr: NonNull<c_void>,
}

// SAFETY: a method bind is an immutable handle into the engine's class
// database. It is never dereferenced by the host, only passed back to ptrcall.
unsafe impl Send for MethodBind {}
unsafe impl Sync for MethodBind {}

impl MethodBind {
    /// Look up `key` through the interface table.
    ///
    /// Returns `None` when the engine has no method matching the triple.
    ///
    /// # Safety
    /// `interface` must come from the currently loaded engine library.
    pub unsafe fn resolve(interface: &ExtensionInterface, key: MethodKey) -> Option<Self> {
        let class = interface.string_name(key.class);
        let method = interface.string_name(key.method);
        let ptr = interface.method_bind(&class, &method, key.hash);

        match NonNull::new(ptr.cast_mut()) {
            Some(ptr) => {
                debug!(
                    class = key.class_name(),
                    method = key.method_name(),
                    hash = key.hash,
                    "Resolved method bind"
                );
                Some(Self { key, ptr })
            }
            None => {
                warn!(
                    class = key.class_name(),
                    method = key.method_name(),
                    hash = key.hash,
                    "Method bind not found"
                );
                None
            }
        }
    }

    pub fn key(&self) -> MethodKey {
        self.key
    }

    /// Ptrcall the bind on `instance` with no arguments, reading a `bool` back.
    ///
    /// # Safety
    /// `instance` must be a live object of the bind's class and the bind's
    /// fingerprint must describe `() -> bool`.
    pub(crate) unsafe fn call_bool(
        &self,
        interface: &ExtensionInterface,
        instance: NonNull<c_void>,
    ) -> bool {
        let args: [ConstTypePtr; 0] = [];
        let mut ret = ReturnBuf([GDEXTENSION_FALSE; 16]);
        interface.ptrcall(
            self.ptr.as_ptr().cast_const(),
            instance.as_ptr(),
            &args,
            ret.0.as_mut_ptr().cast(),
        );
        ret.0[0] != GDEXTENSION_FALSE
    }
}

/// Binds resolved during the init handshake, held for the process lifetime.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodBindCache {
    start: Option<MethodBind>,
    iteration: Option<MethodBind>,
}

impl MethodBindCache {
    /// Resolve every cached bind.
    ///
    /// Without an interface table nothing is resolved and the cache stays
    /// empty; callers reject the missing bind at the point of use.
    ///
    /// # Safety
    /// See [`MethodBind::resolve`].
    pub unsafe fn resolve(interface: Option<&ExtensionInterface>) -> Self {
        let Some(interface) = interface else {
            warn!("No interface table available, method binds left unresolved");
            return Self::default();
        };

        Self {
            start: MethodBind::resolve(interface, GODOT_INSTANCE_START),
            iteration: MethodBind::resolve(interface, GODOT_INSTANCE_ITERATION),
        }
    }

    pub fn start(&self) -> Result<&MethodBind, HostError> {
        self.get(&GODOT_INSTANCE_START)
    }

    pub fn iteration(&self) -> Result<&MethodBind, HostError> {
        self.get(&GODOT_INSTANCE_ITERATION)
    }

    /// Cached bind for `key`, or `BindUnavailable` if it was never resolved.
    pub fn get(&self, key: &MethodKey) -> Result<&MethodBind, HostError> {
        let slot = if *key == GODOT_INSTANCE_START {
            &self.start
        } else if *key == GODOT_INSTANCE_ITERATION {
            &self.iteration
        } else {
            &None
        };
        slot.as_ref().ok_or_else(|| key.unavailable())
    }
}
