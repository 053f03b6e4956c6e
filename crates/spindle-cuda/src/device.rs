//! Device availability probes.
//!
//! Callers use these to decide whether to take the GPU path at all, so
//! a failure here is an answer ("no device"), not a fault: the probes
//! inspect the native result inline instead of escalating through the
//! checking protocol.

/// Number of CUDA devices visible to this process. Zero when the
/// `cuda` feature is disabled, no device is present, or the runtime
/// cannot be queried.
#[must_use]
pub fn device_count() -> usize {
    #[cfg(feature = "cuda")]
    {
        use crate::ffi::runtime::{cudaGetDeviceCount, cudaSuccess};
        let mut count: i32 = 0;
        // SAFETY: count is a valid out-pointer
        let result = unsafe { cudaGetDeviceCount(&mut count) };
        if result == cudaSuccess && count > 0 {
            return count as usize;
        }
        0
    }
    #[cfg(not(feature = "cuda"))]
    {
        0
    }
}

/// Check if any CUDA device is available.
#[must_use]
pub fn is_gpu_available() -> bool {
    device_count() > 0
}
