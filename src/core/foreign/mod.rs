//! Purpose: Safe ownership of result strings allocated by the foreign runtime.
//! Exports: `ForeignRuntime`, `ForeignString`, `release_and_read`, `MallocRuntime`.
//! Role: The only place that touches foreign-owned memory.
//! Invariants: A `ForeignString` frees its buffer exactly once, in `Drop`, after any copy.
//! Invariants: Null handles are contract violations and panic instead of returning `Error`.
//! Invariants: All FFI interaction is confined to this module + `sys`.
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr::{self, NonNull};

use crate::core::error::{Error, ErrorKind};

#[cfg(feature = "libsuseconnect")]
pub mod sys;

/// Releases buffers that a foreign runtime handed out.
pub trait ForeignRuntime {
    /// Frees one result buffer.
    ///
    /// # Safety
    /// `ptr` must have been allocated by this runtime and must not have been freed before.
    unsafe fn free_string(&self, ptr: *mut c_char);
}

impl<R: ForeignRuntime + ?Sized> ForeignRuntime for &R {
    unsafe fn free_string(&self, ptr: *mut c_char) {
        unsafe { (**self).free_string(ptr) }
    }
}

/// Scoped owner of one foreign result buffer.
pub struct ForeignString<'rt, R: ForeignRuntime + ?Sized> {
    ptr: NonNull<c_char>,
    len: Option<usize>,
    runtime: &'rt R,
}

impl<'rt, R: ForeignRuntime + ?Sized> ForeignString<'rt, R> {
    /// Takes ownership of a NUL-terminated buffer.
    ///
    /// # Safety
    /// `ptr` must point to a NUL-terminated buffer allocated by `runtime` and not yet freed.
    /// The caller must not use `ptr` after this call.
    ///
    /// # Panics
    /// Panics if `ptr` is null.
    pub unsafe fn from_raw(ptr: *mut c_char, runtime: &'rt R) -> Self {
        let Some(ptr) = NonNull::new(ptr) else {
            panic!("foreign result handle is null");
        };
        Self {
            ptr,
            len: None,
            runtime,
        }
    }

    /// Takes ownership of a length-delimited buffer.
    ///
    /// # Safety
    /// `ptr` must point to at least `len` readable bytes allocated by `runtime` and not yet
    /// freed. The caller must not use `ptr` after this call.
    ///
    /// # Panics
    /// Panics if `ptr` is null.
    pub unsafe fn from_raw_parts(ptr: *mut c_char, len: usize, runtime: &'rt R) -> Self {
        let Some(ptr) = NonNull::new(ptr) else {
            panic!("foreign result handle is null");
        };
        Self {
            ptr,
            len: Some(len),
            runtime,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self.len {
            None => unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
                .to_bytes()
                .to_vec(),
            Some(len) => {
                unsafe { std::slice::from_raw_parts(self.ptr.as_ptr() as *const u8, len) }.to_vec()
            }
        }
    }

    /// Copies the text out and frees the buffer, in that order.
    pub fn into_string(self) -> Result<String, Error> {
        let bytes = self.to_bytes();
        drop(self);
        String::from_utf8(bytes).map_err(|err| {
            Error::new(ErrorKind::Decode)
                .with_message("result is not valid utf-8")
                .with_source(err)
        })
    }
}

impl<R: ForeignRuntime + ?Sized> Drop for ForeignString<'_, R> {
    fn drop(&mut self) {
        tracing::trace!(ptr = ?self.ptr, "releasing foreign result buffer");
        unsafe { self.runtime.free_string(self.ptr.as_ptr()) };
    }
}

/// Copies a NUL-terminated foreign result into host memory and frees the original.
///
/// # Safety
/// Same contract as [`ForeignString::from_raw`]; `handle` is invalid once this returns.
///
/// # Panics
/// Panics if `handle` is null.
pub unsafe fn release_and_read<R: ForeignRuntime + ?Sized>(
    runtime: &R,
    handle: *mut c_char,
) -> Result<String, Error> {
    unsafe { ForeignString::from_raw(handle, runtime) }.into_string()
}

/// Runtime whose buffers come from `libc::malloc`, the allocator behind cgo's `C.CString`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MallocRuntime;

impl MallocRuntime {
    pub fn alloc_string(&self, text: &str) -> Result<*mut c_char, Error> {
        self.alloc_bytes(text.as_bytes())
    }

    /// Allocates a NUL-terminated copy of `bytes`; the bytes need not be UTF-8.
    ///
    /// An interior NUL ends the string for any reader, as it would in a buffer
    /// handed over by the foreign runtime.
    pub fn alloc_bytes(&self, bytes: &[u8]) -> Result<*mut c_char, Error> {
        let ptr = unsafe { libc::malloc(bytes.len() + 1) } as *mut c_char;
        if ptr.is_null() {
            return Err(Error::new(ErrorKind::Io).with_message("malloc failed"));
        }
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, ptr, bytes.len());
            *ptr.add(bytes.len()) = 0;
        }
        Ok(ptr)
    }
}

impl ForeignRuntime for MallocRuntime {
    unsafe fn free_string(&self, ptr: *mut c_char) {
        unsafe { libc::free(ptr as *mut libc::c_void) };
    }
}

/// Runtime backed by the linked libsuseconnect.
#[cfg(feature = "libsuseconnect")]
#[derive(Clone, Copy, Debug, Default)]
pub struct SuseConnectRuntime;

#[cfg(feature = "libsuseconnect")]
impl ForeignRuntime for SuseConnectRuntime {
    unsafe fn free_string(&self, ptr: *mut c_char) {
        unsafe { sys::free_string(ptr) };
    }
}
