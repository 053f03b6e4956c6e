//! cuSPARSE bindings (`libcusparse.so`) — the sparse math-library family.
//!
//! Like cuBLAS, cuSPARSE reports failures as enumerated status codes
//! with no message-formatting facility; diagnostics carry the raw
//! status value.

#![allow(non_camel_case_types)]

use std::ffi::c_void;
use std::os::raw::c_int;

#[cfg(feature = "cuda")]
use super::runtime::cudaStream_t;

// =============================================================================
// TYPE ALIASES
// =============================================================================

/// Opaque cuSPARSE library session handle.
pub type cusparseHandle_t = *mut c_void;

/// cuSPARSE status code. 0 = success, non-zero = error.
pub type cusparseStatus_t = c_int;

// =============================================================================
// STATUS CODES (cusparse.h)
// =============================================================================

/// Operation completed successfully.
pub const CUSPARSE_STATUS_SUCCESS: cusparseStatus_t = 0;

/// The library was not initialized (`cusparseCreate` missing or failed).
pub const CUSPARSE_STATUS_NOT_INITIALIZED: cusparseStatus_t = 1;

/// Internal resource allocation failed.
pub const CUSPARSE_STATUS_ALLOC_FAILED: cusparseStatus_t = 2;

/// An unsupported value or parameter was passed.
pub const CUSPARSE_STATUS_INVALID_VALUE: cusparseStatus_t = 3;

/// The device does not support the requested operation.
pub const CUSPARSE_STATUS_ARCH_MISMATCH: cusparseStatus_t = 4;

/// Access to GPU memory space failed.
pub const CUSPARSE_STATUS_MAPPING_ERROR: cusparseStatus_t = 5;

/// The GPU program failed to execute.
pub const CUSPARSE_STATUS_EXECUTION_FAILED: cusparseStatus_t = 6;

/// An internal cuSPARSE operation failed.
pub const CUSPARSE_STATUS_INTERNAL_ERROR: cusparseStatus_t = 7;

/// The matrix type is not supported by this function.
pub const CUSPARSE_STATUS_MATRIX_TYPE_NOT_SUPPORTED: cusparseStatus_t = 8;

// =============================================================================
// FFI DECLARATIONS
// =============================================================================

#[cfg(feature = "cuda")]
#[link(name = "cusparse")]
extern "C" {
    /// Create a cuSPARSE session bound to the current device context.
    pub fn cusparseCreate(handle: *mut cusparseHandle_t) -> cusparseStatus_t;

    /// Release a cuSPARSE session and its device-side resources.
    pub fn cusparseDestroy(handle: cusparseHandle_t) -> cusparseStatus_t;

    /// Associate a session with a stream; subsequent library calls
    /// through the handle are ordered on that stream.
    pub fn cusparseSetStream(handle: cusparseHandle_t, stream: cudaStream_t) -> cusparseStatus_t;
}

/// Check if a cuSPARSE status indicates success.
#[inline]
#[must_use]
pub const fn is_cusparse_success(status: cusparseStatus_t) -> bool {
    status == CUSPARSE_STATUS_SUCCESS
}
