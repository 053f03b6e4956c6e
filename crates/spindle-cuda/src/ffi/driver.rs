//! CUDA Driver API bindings (`libcuda.so`).
//!
//! The driver family reports failures as `CUresult` codes and exposes a
//! name-lookup facility (`cuGetErrorName`) that the checking protocol
//! uses for diagnostics.

#![allow(non_camel_case_types)]

#[cfg(feature = "cuda")]
use std::ffi::CStr;
#[cfg(feature = "cuda")]
use std::os::raw::c_char;
#[cfg(feature = "cuda")]
use std::os::raw::c_uint;
use std::os::raw::c_int;

// =============================================================================
// TYPE ALIASES
// =============================================================================

/// CUDA driver result code. 0 = success, non-zero = error.
pub type CUresult = c_int;

// =============================================================================
// RESULT CODES (cuda.h, CUDA 11+ numbering)
// =============================================================================

/// Operation completed successfully.
pub const CUDA_SUCCESS: CUresult = 0;

/// An invalid value was passed to a driver call.
pub const CUDA_ERROR_INVALID_VALUE: CUresult = 1;

/// The driver could not allocate enough device memory.
pub const CUDA_ERROR_OUT_OF_MEMORY: CUresult = 2;

/// The driver is not initialized. Call `cuInit` first.
pub const CUDA_ERROR_NOT_INITIALIZED: CUresult = 3;

/// The driver is shutting down. Observed during process teardown races;
/// the checking protocol still treats it as fatal for in-flight work,
/// and teardown paths route around the protocol instead.
pub const CUDA_ERROR_DEINITIALIZED: CUresult = 4;

/// No CUDA-capable device is available.
pub const CUDA_ERROR_NO_DEVICE: CUresult = 100;

/// Invalid device ordinal.
pub const CUDA_ERROR_INVALID_DEVICE: CUresult = 101;

// =============================================================================
// FFI DECLARATIONS
// =============================================================================

#[cfg(feature = "cuda")]
#[link(name = "cuda")]
extern "C" {
    /// Initialize the CUDA driver. Must precede every other driver call.
    /// Thread-safe and idempotent with `flags = 0`.
    pub fn cuInit(flags: c_uint) -> CUresult;

    /// Look up the enumerator name for a result code (e.g.
    /// `"CUDA_ERROR_NO_DEVICE"`). Fails with `CUDA_ERROR_INVALID_VALUE`
    /// for codes the installed driver does not know.
    pub fn cuGetErrorName(error: CUresult, pstr: *mut *const c_char) -> CUresult;

    /// Get the CUDA driver version, encoded as major * 1000 + minor * 10.
    pub fn cuDriverGetVersion(version: *mut c_int) -> CUresult;

    /// Get the number of CUDA devices.
    pub fn cuDeviceGetCount(count: *mut c_int) -> CUresult;
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Check if a driver result indicates success.
#[inline]
#[must_use]
pub const fn is_driver_success(result: CUresult) -> bool {
    result == CUDA_SUCCESS
}

/// Enumerator name for a driver result code.
///
/// Asks the driver via `cuGetErrorName` when the `cuda` feature is
/// enabled; falls back to a host-side rendering of the numeric code
/// otherwise, or when the driver does not recognize the code.
#[must_use]
pub fn error_name(result: CUresult) -> String {
    #[cfg(feature = "cuda")]
    {
        let mut name: *const c_char = std::ptr::null();
        // SAFETY: name is a valid out-pointer; the driver returns a
        // static NUL-terminated string it owns.
        let rc = unsafe { cuGetErrorName(result, &mut name) };
        if rc == CUDA_SUCCESS && !name.is_null() {
            // SAFETY: non-null result from cuGetErrorName is NUL-terminated
            return unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
        }
    }
    fallback_error_name(result)
}

/// Host-side rendering of the well-known driver result codes.
fn fallback_error_name(result: CUresult) -> String {
    match result {
        CUDA_SUCCESS => "CUDA_SUCCESS".to_string(),
        CUDA_ERROR_INVALID_VALUE => "CUDA_ERROR_INVALID_VALUE".to_string(),
        CUDA_ERROR_OUT_OF_MEMORY => "CUDA_ERROR_OUT_OF_MEMORY".to_string(),
        CUDA_ERROR_NOT_INITIALIZED => "CUDA_ERROR_NOT_INITIALIZED".to_string(),
        CUDA_ERROR_DEINITIALIZED => "CUDA_ERROR_DEINITIALIZED".to_string(),
        CUDA_ERROR_NO_DEVICE => "CUDA_ERROR_NO_DEVICE".to_string(),
        CUDA_ERROR_INVALID_DEVICE => "CUDA_ERROR_INVALID_DEVICE".to_string(),
        code => format!("CUDA_ERROR_UNKNOWN ({code})"),
    }
}
