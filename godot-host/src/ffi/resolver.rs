//! Proc-address resolution
//!
//! The engine hands the init callback a `get_proc_address` function. Callers
//! here supply only the symbol bytes; the terminator is appended before the
//! name crosses the boundary.

use std::ffi::CString;
use tracing::{debug, warn};

use super::{GetProcAddressFn, InterfaceFunctionPtr};
use crate::error::InitError;

/// Look up `name` through the engine's `get_proc_address` callback.
///
/// A null result is reported as [`InitError::SymbolNotFound`] and is never
/// retried: it means the engine library is not the version this host was
/// built against.
pub fn resolve_raw(
    get_proc_address: GetProcAddressFn,
    name: &[u8],
) -> Result<unsafe extern "C" fn(), InitError> {
    let symbol_name = String::from_utf8_lossy(name).into_owned();
    let c_name =
        CString::new(name).map_err(|_| InitError::InvalidSymbolName(symbol_name.clone()))?;

    let ptr: InterfaceFunctionPtr = unsafe { get_proc_address(c_name.as_ptr()) };

    match ptr {
        Some(func) => {
            debug!(symbol = %symbol_name, "Resolved interface function");
            Ok(func)
        }
        None => {
            warn!(symbol = %symbol_name, "Interface function missing");
            Err(InitError::SymbolNotFound(symbol_name))
        }
    }
}

/// Resolve `name` and reinterpret it as the function pointer type `F`.
///
/// # Safety
/// `F` must be an `extern "C"` function pointer type whose signature matches
/// the native definition of `name`.
pub unsafe fn resolve<F: Copy>(
    get_proc_address: GetProcAddressFn,
    name: &[u8],
) -> Result<F, InitError> {
    let raw = resolve_raw(get_proc_address, name)?;
    debug_assert_eq!(
        std::mem::size_of::<F>(),
        std::mem::size_of::<unsafe extern "C" fn()>()
    );
    Ok(std::mem::transmute_copy::<unsafe extern "C" fn(), F>(&raw))
}
