//! cuBLAS bindings (`libcublas.so`) — the dense math-library family.
//!
//! cuBLAS reports failures as `cublasStatus_t` codes and exposes no
//! message-formatting facility; diagnostics carry the raw status value.

#![allow(non_camel_case_types)]

use std::ffi::c_void;
use std::os::raw::c_int;

#[cfg(feature = "cuda")]
use super::runtime::cudaStream_t;

// =============================================================================
// TYPE ALIASES
// =============================================================================

/// Opaque cuBLAS library session handle.
pub type cublasHandle_t = *mut c_void;

/// cuBLAS status code. 0 = success, non-zero = error.
pub type cublasStatus_t = c_int;

// =============================================================================
// STATUS CODES (cublas_api.h)
// =============================================================================

/// Operation completed successfully.
pub const CUBLAS_STATUS_SUCCESS: cublasStatus_t = 0;

/// The library was not initialized (`cublasCreate_v2` missing or failed).
pub const CUBLAS_STATUS_NOT_INITIALIZED: cublasStatus_t = 1;

/// Internal resource allocation failed.
pub const CUBLAS_STATUS_ALLOC_FAILED: cublasStatus_t = 3;

/// An unsupported value or parameter was passed.
pub const CUBLAS_STATUS_INVALID_VALUE: cublasStatus_t = 7;

/// The device does not support the requested operation.
pub const CUBLAS_STATUS_ARCH_MISMATCH: cublasStatus_t = 8;

/// Access to GPU memory space failed.
pub const CUBLAS_STATUS_MAPPING_ERROR: cublasStatus_t = 11;

/// The GPU program failed to execute.
pub const CUBLAS_STATUS_EXECUTION_FAILED: cublasStatus_t = 13;

/// An internal cuBLAS operation failed.
pub const CUBLAS_STATUS_INTERNAL_ERROR: cublasStatus_t = 14;

// =============================================================================
// FFI DECLARATIONS
// =============================================================================

#[cfg(feature = "cuda")]
#[link(name = "cublas")]
extern "C" {
    /// Create a cuBLAS session bound to the current device context.
    pub fn cublasCreate_v2(handle: *mut cublasHandle_t) -> cublasStatus_t;

    /// Release a cuBLAS session and its device-side resources.
    pub fn cublasDestroy_v2(handle: cublasHandle_t) -> cublasStatus_t;

    /// Associate a session with a stream; subsequent library calls
    /// through the handle are ordered on that stream.
    pub fn cublasSetStream_v2(handle: cublasHandle_t, stream: cudaStream_t) -> cublasStatus_t;
}

/// Check if a cuBLAS status indicates success.
#[inline]
#[must_use]
pub const fn is_cublas_success(status: cublasStatus_t) -> bool {
    status == CUBLAS_STATUS_SUCCESS
}
