//! Raw bindings to the four native API families this crate drives.
//!
//! These are the ONLY CUDA FFI declarations in the workspace. Each
//! submodule covers one family and follows the same layout: type
//! aliases, named result codes, the `extern "C"` surface (behind the
//! `cuda` feature), and pure helpers that work without a device.
//!
//! Result-code constants are declared host-side so the checking
//! protocol and its tests never need the toolkit headers; a pinned test
//! in each submodule keeps them honest against the CUDA headers.

pub mod cublas;
pub mod cusparse;
pub mod driver;
pub mod runtime;

pub use cublas::{cublasHandle_t, cublasStatus_t, CUBLAS_STATUS_SUCCESS};
pub use cusparse::{cusparseHandle_t, cusparseStatus_t, CUSPARSE_STATUS_SUCCESS};
pub use driver::{CUresult, CUDA_SUCCESS};
pub use runtime::{cudaError_t, cudaStream_t, cudaErrorCudartUnloading, cudaSuccess};
