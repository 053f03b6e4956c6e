//! CUDA Runtime API bindings (`libcudart.so`).
//!
//! The runtime family reports failures as `cudaError_t` codes and
//! exposes a message-lookup facility (`cudaGetErrorString`). It is the
//! family that owns streams and device memory, so it carries the widest
//! surface here.

#![allow(non_camel_case_types)]
#![allow(non_upper_case_globals)]

use std::ffi::c_void;
use std::os::raw::c_int;
#[cfg(feature = "cuda")]
use std::ffi::CStr;
#[cfg(feature = "cuda")]
use std::os::raw::c_char;

// =============================================================================
// TYPE ALIASES
// =============================================================================

/// CUDA runtime result code. 0 = success, non-zero = error.
pub type cudaError_t = c_int;

/// Opaque stream handle: an ordered queue of device work. Null means
/// the legacy default stream.
pub type cudaStream_t = *mut c_void;

// =============================================================================
// RESULT CODES (driver_types.h, CUDA 10+ numbering)
// =============================================================================

/// Operation completed successfully.
pub const cudaSuccess: cudaError_t = 0;

/// An invalid value was passed to a runtime call.
pub const cudaErrorInvalidValue: cudaError_t = 1;

/// The runtime could not allocate enough device memory.
pub const cudaErrorMemoryAllocation: cudaError_t = 2;

/// The runtime is unloading, typically because the process is exiting.
/// Calls issued during this window race driver teardown; the checking
/// protocol treats this code as benign.
pub const cudaErrorCudartUnloading: cudaError_t = 4;

/// No CUDA-capable device is available.
pub const cudaErrorNoDevice: cudaError_t = 100;

/// Invalid device ordinal.
pub const cudaErrorInvalidDevice: cudaError_t = 101;

// =============================================================================
// FFI DECLARATIONS
// =============================================================================

#[cfg(feature = "cuda")]
#[link(name = "cudart")]
extern "C" {
    /// Message lookup for a runtime result code. Always returns a valid
    /// static string, even for unknown codes.
    pub fn cudaGetErrorString(error: cudaError_t) -> *const c_char;

    /// Create an asynchronous stream on the current device.
    pub fn cudaStreamCreate(stream: *mut cudaStream_t) -> cudaError_t;

    /// Destroy a stream. Pending work is drained first.
    pub fn cudaStreamDestroy(stream: cudaStream_t) -> cudaError_t;

    /// Block the calling host thread until the stream has drained.
    pub fn cudaStreamSynchronize(stream: cudaStream_t) -> cudaError_t;

    /// Allocate `size` bytes of device memory.
    pub fn cudaMalloc(dev_ptr: *mut *mut c_void, size: usize) -> cudaError_t;

    /// Free device memory allocated with `cudaMalloc`.
    pub fn cudaFree(dev_ptr: *mut c_void) -> cudaError_t;

    /// Get the number of CUDA devices.
    pub fn cudaGetDeviceCount(count: *mut c_int) -> cudaError_t;

    /// Get the device the calling host thread is operating on.
    pub fn cudaGetDevice(device: *mut c_int) -> cudaError_t;

    /// Set the device for the calling host thread.
    pub fn cudaSetDevice(device: c_int) -> cudaError_t;
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Check if a runtime result indicates success.
///
/// `cudaErrorCudartUnloading` is NOT success; the checking protocol
/// tolerates it separately so the distinction stays visible here.
#[inline]
#[must_use]
pub const fn is_runtime_success(result: cudaError_t) -> bool {
    result == cudaSuccess
}

/// Human-readable message for a runtime result code.
///
/// Asks the runtime via `cudaGetErrorString` when the `cuda` feature is
/// enabled; falls back to a host-side rendering otherwise.
#[must_use]
pub fn error_string(result: cudaError_t) -> String {
    #[cfg(feature = "cuda")]
    {
        // SAFETY: cudaGetErrorString returns a static NUL-terminated
        // string for every input value.
        let msg = unsafe { cudaGetErrorString(result) };
        if !msg.is_null() {
            // SAFETY: non-null static string from the runtime
            return unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned();
        }
    }
    fallback_error_string(result)
}

/// Host-side rendering of the well-known runtime result codes.
fn fallback_error_string(result: cudaError_t) -> String {
    match result {
        cudaSuccess => "no error".to_string(),
        cudaErrorInvalidValue => "invalid argument".to_string(),
        cudaErrorMemoryAllocation => "out of memory".to_string(),
        cudaErrorCudartUnloading => "driver shutting down".to_string(),
        cudaErrorNoDevice => "no CUDA-capable device is detected".to_string(),
        cudaErrorInvalidDevice => "invalid device ordinal".to_string(),
        code => format!("unrecognized error code {code}"),
    }
}
