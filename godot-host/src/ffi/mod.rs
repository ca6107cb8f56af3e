//! FFI Bridge - C ABI surface of the embedded engine
//!
//! This module defines the C-ABI compatible types exchanged with a prebuilt
//! LibGodot shared library:
//! - the two exported entry points that create and destroy an engine instance
//! - the GDExtension initialization handshake the engine calls back into
//! - the function pointer shapes resolved through `get_proc_address`
//!
//! Nothing outside the `ffi` and `engine` modules sees raw addresses; the rest
//! of the crate works with the validated tables built from these types.

use std::ffi::c_void;
use std::os::raw::{c_char, c_int};

pub mod resolver;
pub(crate) mod string_name;

pub use resolver::{resolve, resolve_raw};
pub(crate) use string_name::StringNameBuf;

/// GDExtension boolean (`uint8_t`)
pub type GDExtensionBool = u8;
/// GDExtension integer (`int64_t`)
pub type GDExtensionInt = i64;
/// Engine-wide object identifier
pub type GDObjectInstanceID = u64;

pub const GDEXTENSION_TRUE: GDExtensionBool = 1;
pub const GDEXTENSION_FALSE: GDExtensionBool = 0;

pub type ObjectPtr = *mut c_void;
pub type ConstObjectPtr = *const c_void;
pub type MethodBindPtr = *const c_void;
pub type UninitializedStringNamePtr = *mut c_void;
pub type ConstStringNamePtr = *const c_void;
pub type TypePtr = *mut c_void;
pub type ConstTypePtr = *const c_void;
pub type ClassLibraryPtr = *mut c_void;

/// Untyped function pointer handed out by `get_proc_address`
pub type InterfaceFunctionPtr = Option<unsafe extern "C" fn()>;

/// `GDExtensionInterfaceGetProcAddress`
pub type GetProcAddressFn =
    unsafe extern "C" fn(p_function_name: *const c_char) -> InterfaceFunctionPtr;

/// `object_get_instance_id`
pub type ObjectGetInstanceIdFn =
    unsafe extern "C" fn(p_object: ConstObjectPtr) -> GDObjectInstanceID;

/// `classdb_get_method_bind`
pub type ClassdbGetMethodBindFn = unsafe extern "C" fn(
    p_classname: ConstStringNamePtr,
    p_methodname: ConstStringNamePtr,
    p_hash: GDExtensionInt,
) -> MethodBindPtr;

/// `object_method_bind_ptrcall`
pub type ObjectMethodBindPtrcallFn = unsafe extern "C" fn(
    p_method_bind: MethodBindPtr,
    p_instance: ObjectPtr,
    p_args: *const ConstTypePtr,
    r_ret: TypePtr,
);

/// `string_name_new_with_latin1_chars`
pub type StringNameNewWithLatin1CharsFn = unsafe extern "C" fn(
    r_dest: UninitializedStringNamePtr,
    p_contents: *const c_char,
    p_is_static: GDExtensionBool,
);

/// `GDExtensionInitializationLevel`
pub type InitializationLevel = c_int;

/// Lowest initialization level; the host registers nothing above it.
pub const INITIALIZATION_CORE: InitializationLevel = 0;

pub type InitializeHookFn =
    unsafe extern "C" fn(userdata: *mut c_void, p_level: InitializationLevel);

/// `GDExtensionInitialization`
///
/// Filled in by the init callback so the engine knows which levels to
/// drive and which hooks to call for each of them.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Initialization {
    pub minimum_initialization_level: InitializationLevel,
    pub userdata: *mut c_void,
    pub initialize: Option<InitializeHookFn>,
    pub deinitialize: Option<InitializeHookFn>,
}

/// `GDExtensionInitializationFunction`
pub type InitializationFunction = unsafe extern "C" fn(
    p_get_proc_address: Option<GetProcAddressFn>,
    p_library: ClassLibraryPtr,
    r_initialization: *mut Initialization,
) -> GDExtensionBool;

/// `libgodot_create_godot_instance`
pub type CreateInstanceFn = unsafe extern "C" fn(
    p_argc: c_int,
    p_argv: *mut *mut c_char,
    p_init_func: InitializationFunction,
) -> ObjectPtr;

/// `libgodot_destroy_godot_instance`
pub type DestroyInstanceFn = unsafe extern "C" fn(p_godot_instance: ObjectPtr);

// Exported entry points of the engine library. Never renamed at this layer.
pub const CREATE_INSTANCE_SYMBOL: &[u8] = b"libgodot_create_godot_instance";
pub const DESTROY_INSTANCE_SYMBOL: &[u8] = b"libgodot_destroy_godot_instance";

// Interface functions resolved during the init callback.
pub const OBJECT_GET_INSTANCE_ID: &[u8] = b"object_get_instance_id";
pub const CLASSDB_GET_METHOD_BIND: &[u8] = b"classdb_get_method_bind";
pub const OBJECT_METHOD_BIND_PTRCALL: &[u8] = b"object_method_bind_ptrcall";
pub const STRING_NAME_NEW_WITH_LATIN1_CHARS: &[u8] = b"string_name_new_with_latin1_chars";
