//! Interned-name storage for reflection lookups
//!
//! A `StringName` is an opaque, pointer-sized value owned by the engine.
//! The engine constructs it in place, so the host provides correctly sized
//! and aligned storage and never looks inside.

use std::ffi::CStr;

use super::{ConstStringNamePtr, StringNameNewWithLatin1CharsFn, GDEXTENSION_TRUE};

/// Size of an engine `StringName` in bytes.
pub const STRING_NAME_SIZE: usize = 8;

/// Fixed-capacity storage for one engine-constructed interned name.
#[repr(C, align(8))]
pub struct StringNameBuf {
    bytes: [u8; STRING_NAME_SIZE],
}

impl StringNameBuf {
    /// Build an interned name from a static, NUL-terminated Latin-1 string.
    ///
    /// The static flag is set, so the engine may keep pointing at `name`.
    ///
    /// # Safety
    /// `ctor` must be the engine's `string_name_new_with_latin1_chars`.
    pub unsafe fn new_static(ctor: StringNameNewWithLatin1CharsFn, name: &'static CStr) -> Self {
        let mut buf = Self {
            bytes: [0; STRING_NAME_SIZE],
        };
        ctor(buf.bytes.as_mut_ptr().cast(), name.as_ptr(), GDEXTENSION_TRUE);
        buf
    }

    pub fn as_const_ptr(&self) -> ConstStringNamePtr {
        self.bytes.as_ptr().cast()
    }
}
