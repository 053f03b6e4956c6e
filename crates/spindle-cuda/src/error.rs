//! Error types for the non-fatal surfaces of this crate.
//!
//! Native-call failures are deliberately NOT represented here: they go
//! through the checking protocol in [`crate::check`] and are fatal.
//! `CudaError` covers the things a caller can actually act on, such as
//! a rejected configuration or a missing device.

use thiserror::Error;

/// Result alias for fallible spindle-cuda operations.
pub type CudaResult<T> = Result<T, CudaError>;

/// CUDA-side errors that are recoverable at the call site.
#[derive(Debug, Error)]
pub enum CudaError {
    /// No CUDA-capable device is available.
    #[error("no CUDA-capable device available")]
    NoDevice,

    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A host-side memory bookkeeping error (not a device fault).
    #[error("memory error: {0}")]
    MemoryError(String),
}
