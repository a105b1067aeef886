// Raw FFI bindings to the libsuseconnect C ABI.
use std::os::raw::c_char;

unsafe extern "C" {
    /// Frees a result string previously returned by any libsuseconnect call.
    pub fn free_string(ptr: *mut c_char);
}
