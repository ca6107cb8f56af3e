//! Extension Interface Table
//!
//! The handful of engine interface functions this host needs, resolved once
//! from the init handshake. The table is built atomically: either every entry
//! resolves or no table exists.

use std::ffi::CStr;
use tracing::info;

use crate::error::InitError;
use crate::ffi::{
    self, ClassdbGetMethodBindFn, ConstTypePtr, GDObjectInstanceID, GetProcAddressFn,
    MethodBindPtr, ObjectGetInstanceIdFn, ObjectMethodBindPtrcallFn, ObjectPtr,
    StringNameBuf, StringNameNewWithLatin1CharsFn, TypePtr,
};

/// Validated capability table built from `get_proc_address`.
///
/// Immutable after construction and shared read-only by every engine call.
#[derive(Clone, Copy)]
pub struct ExtensionInterface {
    object_get_instance_id: ObjectGetInstanceIdFn,
    classdb_get_method_bind: ClassdbGetMethodBindFn,
    object_method_bind_ptrcall: ObjectMethodBindPtrcallFn,
    string_name_new_with_latin1_chars: StringNameNewWithLatin1CharsFn,
}

impl ExtensionInterface {
    /// Resolve every entry through the engine-supplied `get_proc_address`.
    ///
    /// # Safety
    /// `get_proc_address` must be the callback handed to the init function by
    /// a compatible engine library.
    pub unsafe fn load(get_proc_address: GetProcAddressFn) -> Result<Self, InitError> {
        let table = Self {
            object_get_instance_id: ffi::resolve(get_proc_address, ffi::OBJECT_GET_INSTANCE_ID)?,
            classdb_get_method_bind: ffi::resolve(get_proc_address, ffi::CLASSDB_GET_METHOD_BIND)?,
            object_method_bind_ptrcall: ffi::resolve(
                get_proc_address,
                ffi::OBJECT_METHOD_BIND_PTRCALL,
            )?,
            string_name_new_with_latin1_chars: ffi::resolve(
                get_proc_address,
                ffi::STRING_NAME_NEW_WITH_LATIN1_CHARS,
            )?,
        };

        info!("Extension interface table resolved");
        Ok(table)
    }

    pub(crate) unsafe fn instance_id(&self, object: ObjectPtr) -> GDObjectInstanceID {
        (self.object_get_instance_id)(object.cast_const())
    }

    pub(crate) unsafe fn string_name(&self, name: &'static CStr) -> StringNameBuf {
        StringNameBuf::new_static(self.string_name_new_with_latin1_chars, name)
    }

    pub(crate) unsafe fn method_bind(
        &self,
        class: &StringNameBuf,
        method: &StringNameBuf,
        hash: i64,
    ) -> MethodBindPtr {
        (self.classdb_get_method_bind)(class.as_const_ptr(), method.as_const_ptr(), hash)
    }

    pub(crate) unsafe fn ptrcall(
        &self,
        bind: MethodBindPtr,
        instance: ObjectPtr,
        args: &[ConstTypePtr],
        ret: TypePtr,
    ) {
        (self.object_method_bind_ptrcall)(bind, instance, args.as_ptr(), ret)
    }
}

impl std::fmt::Debug for ExtensionInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionInterface").finish_non_exhaustive()
    }
}
