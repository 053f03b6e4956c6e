#![deny(deprecated)]

//! Per-thread CUDA execution contexts for Spindle.
//!
//! This crate owns two things and nothing else:
//!
//! - The **checking protocol** ([`check`]): four checking operations,
//!   one per native API family (CUDA driver, CUDA runtime, cuSPARSE,
//!   cuBLAS), that turn every raw result code into either silence or a
//!   fatal diagnostic naming the failing call. See the `*_call!`
//!   macros.
//! - The **thread context** ([`context::CudaThreadContext`]): each
//!   thread's lazily-built bundle of compute stream, cuSPARSE handle,
//!   cuBLAS handle, and scratch-memory pool, reachable only from its
//!   owning thread.
//!
//! # Feature flags
//!
//! - `cuda` — link the CUDA toolkit and compile the native surface.
//!   Without it the crate is host-only: the checking protocol, the
//!   handle state machine, and the workspace pool still build and test,
//!   and [`device::is_gpu_available`] is `false` at compile time.
//!
//! # Example
//!
//! ```ignore
//! use spindle_cuda::context::CudaThreadContext;
//! use spindle_cuda::{cublas_call, cuda_call};
//!
//! CudaThreadContext::with(|ctx| {
//!     let handle = ctx.cublas(); // bound to this thread's stream
//!     let scratch = ctx.workspace.acquire(n * std::mem::size_of::<f32>());
//!     // ... launch work through `handle`, every call checked:
//!     // cublas_call!(unsafe { cublasSgemm_v2(handle, ..) });
//!     ctx.workspace.release(scratch);
//!     ctx.synchronize();
//! });
//! ```

pub mod check;
pub mod context;
pub mod device;
pub mod error;
pub mod ffi;
pub mod workspace;

pub use check::{check_cublas, check_cusparse, check_driver, check_runtime};
pub use context::{CudaThreadContext, LazyHandle};
pub use device::{device_count, is_gpu_available};
pub use error::{CudaError, CudaResult};
pub use workspace::{
    DeviceAllocator, HostAlloc, Workspace, WorkspacePool, WorkspacePoolConfig,
};

#[cfg(feature = "cuda")]
pub use workspace::CudaMalloc;
