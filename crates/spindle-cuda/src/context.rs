//! Per-thread CUDA execution context.
//!
//! Every thread that touches the device owns exactly one
//! [`CudaThreadContext`]: a compute stream, a cuSPARSE handle, a cuBLAS
//! handle, and a scratch-memory pool. The bundle is created lazily on
//! the thread's first request and lives until the thread exits. It is
//! never shared, copied, or migrated; handles bound to one thread's
//! stream are undefined behavior when used from another thread at the
//! native level, so the type is deliberately unreachable from other
//! threads (thread-local storage, and raw handle members keep it
//! `!Send`).
//!
//! Work submitted through one context's handles is ordered by the
//! device's in-order-per-stream contract. Nothing is ordered across
//! threads; callers that need cross-context ordering synchronize
//! outside this module.

use std::cell::RefCell;

use crate::ffi::cublas::cublasHandle_t;
use crate::ffi::cusparse::cusparseHandle_t;
use crate::ffi::runtime::cudaStream_t;
use crate::workspace::WorkspacePool;

// ============================================================================
// Handle state machine
// ============================================================================

/// One native handle, explicitly unbound until its first use.
///
/// Binding is a single guarded transition: the initializer runs only if
/// the slot is unbound, and the bound value is returned unchanged ever
/// after. [`take`](Self::take) is the only way back to unbound, used by
/// explicit rebinds and teardown.
#[derive(Debug)]
pub struct LazyHandle<T: Copy> {
    slot: Option<T>,
}

impl<T: Copy> LazyHandle<T> {
    /// An unbound slot.
    #[must_use]
    pub const fn unbound() -> Self {
        Self { slot: None }
    }

    /// Whether the handle has been bound.
    #[inline]
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.slot.is_some()
    }

    /// The bound handle, if any.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.slot
    }

    /// Return the bound handle, binding it first via `bind` if this is
    /// the first access. `bind` runs at most once over the slot's
    /// lifetime between resets.
    pub fn get_or_bind_with(&mut self, bind: impl FnOnce() -> T) -> T {
        match self.slot {
            Some(handle) => handle,
            None => {
                let handle = bind();
                self.slot = Some(handle);
                handle
            }
        }
    }

    /// Unbind, handing the previous handle to the caller for release.
    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }
}

impl<T: Copy> Default for LazyHandle<T> {
    fn default() -> Self {
        Self::unbound()
    }
}

// ============================================================================
// Thread context
// ============================================================================

thread_local! {
    static THREAD_CONTEXT: RefCell<CudaThreadContext> =
        RefCell::new(CudaThreadContext::new());
}

/// The calling thread's bundle of device resources.
///
/// Fields are public in the spirit of the native APIs they wrap: a call
/// site that drives cuSPARSE directly binds and reads
/// `ctx.cusparse` itself, going through the checking protocol for the
/// native calls it issues. The `cuda`-gated methods below cover the
/// common bindings.
pub struct CudaThreadContext {
    /// The thread's compute stream. Unbound until the first call site
    /// needs it; unbound reads mean the legacy default stream.
    pub stream: LazyHandle<cudaStream_t>,
    /// Sparse math-library session, bound to `stream` on first use.
    pub cusparse: LazyHandle<cusparseHandle_t>,
    /// Dense math-library session, bound to `stream` on first use.
    pub cublas: LazyHandle<cublasHandle_t>,
    /// Scratch memory scoped to this thread.
    ///
    /// Declared last: teardown releases the math handles and the stream
    /// first, then the pool drains, so the native libraries never
    /// outlive the memory they may still reference.
    pub workspace: WorkspacePool,
}

impl CudaThreadContext {
    fn new() -> Self {
        Self {
            stream: LazyHandle::unbound(),
            cusparse: LazyHandle::unbound(),
            cublas: LazyHandle::unbound(),
            workspace: WorkspacePool::new(),
        }
    }

    /// Run `f` with the calling thread's context, constructing it on
    /// the thread's first call.
    ///
    /// Repeated calls from one thread see the same instance: state
    /// bound in an earlier call is visible in every later one. Other
    /// threads' contexts are completely independent.
    ///
    /// # Panics
    ///
    /// Panics if called reentrantly from within `f`; the context is
    /// single-borrow by design, and a reentrant bind or reset through a
    /// second borrow would be exactly the kind of same-thread race the
    /// handles cannot survive.
    pub fn with<R>(f: impl FnOnce(&mut CudaThreadContext) -> R) -> R {
        THREAD_CONTEXT.with(|ctx| f(&mut ctx.borrow_mut()))
    }

    /// Unbind every handle, releasing the native objects, so the next
    /// access rebinds from scratch. The explicit rebind path, e.g. for
    /// moving the context onto a fresh stream after a device reset.
    ///
    /// Handles are released before the stream (reverse acquisition
    /// order). Cached workspace blocks are kept; call
    /// [`WorkspacePool::drain`] separately to drop those too.
    pub fn reset(&mut self) {
        self.release_native_handles();
    }

    #[cfg(feature = "cuda")]
    fn release_native_handles(&mut self) {
        use crate::ffi::cublas::{cublasDestroy_v2, CUBLAS_STATUS_SUCCESS};
        use crate::ffi::cusparse::{cusparseDestroy, CUSPARSE_STATUS_SUCCESS};
        use crate::ffi::runtime::{cudaErrorCudartUnloading, cudaStreamDestroy, cudaSuccess};

        // Teardown must never panic, so these calls bypass the checking
        // protocol and log instead. The unloading code is the usual
        // process-exit race and not worth a log line.
        if let Some(handle) = self.cublas.take() {
            // SAFETY: handle came from cublasCreate_v2 and is unbound now
            let status = unsafe { cublasDestroy_v2(handle) };
            if status != CUBLAS_STATUS_SUCCESS {
                tracing::warn!(status, "cublasDestroy_v2 failed during context teardown");
            }
        }
        if let Some(handle) = self.cusparse.take() {
            // SAFETY: handle came from cusparseCreate and is unbound now
            let status = unsafe { cusparseDestroy(handle) };
            if status != CUSPARSE_STATUS_SUCCESS {
                tracing::warn!(status, "cusparseDestroy failed during context teardown");
            }
        }
        if let Some(stream) = self.stream.take() {
            // SAFETY: stream came from cudaStreamCreate; both handles
            // that referenced it are already gone
            let result = unsafe { cudaStreamDestroy(stream) };
            if result != cudaSuccess && result != cudaErrorCudartUnloading {
                tracing::warn!(code = result, "cudaStreamDestroy failed during context teardown");
            }
        }
    }

    #[cfg(not(feature = "cuda"))]
    fn release_native_handles(&mut self) {
        // Host-only build: nothing native to release
        let _ = self.cublas.take();
        let _ = self.cusparse.take();
        let _ = self.stream.take();
    }
}

#[cfg(feature = "cuda")]
impl CudaThreadContext {
    /// The thread's stream, created on first use.
    pub fn stream(&mut self) -> cudaStream_t {
        use crate::ffi::runtime::cudaStreamCreate;

        self.stream.get_or_bind_with(|| {
            let mut stream: cudaStream_t = std::ptr::null_mut();
            // SAFETY: stream is a valid out-pointer
            unsafe { crate::cuda_call!(cudaStreamCreate(&mut stream)) };
            tracing::debug!("created per-thread CUDA stream");
            stream
        })
    }

    /// The thread's cuSPARSE session, created and associated with the
    /// thread's stream on first use.
    pub fn cusparse(&mut self) -> cusparseHandle_t {
        use crate::ffi::cusparse::{cusparseCreate, cusparseSetStream};

        let stream = self.stream();
        self.cusparse.get_or_bind_with(|| {
            let mut handle: cusparseHandle_t = std::ptr::null_mut();
            // SAFETY: handle is a valid out-pointer; stream is this
            // thread's live stream
            unsafe {
                crate::cusparse_call!(cusparseCreate(&mut handle));
                crate::cusparse_call!(cusparseSetStream(handle, stream));
            }
            tracing::debug!("bound cuSPARSE session to the thread stream");
            handle
        })
    }

    /// The thread's cuBLAS session, created and associated with the
    /// thread's stream on first use.
    pub fn cublas(&mut self) -> cublasHandle_t {
        use crate::ffi::cublas::{cublasCreate_v2, cublasSetStream_v2};

        let stream = self.stream();
        self.cublas.get_or_bind_with(|| {
            let mut handle: cublasHandle_t = std::ptr::null_mut();
            // SAFETY: handle is a valid out-pointer; stream is this
            // thread's live stream
            unsafe {
                crate::cublas_call!(cublasCreate_v2(&mut handle));
                crate::cublas_call!(cublasSetStream_v2(handle, stream));
            }
            tracing::debug!("bound cuBLAS session to the thread stream");
            handle
        })
    }

    /// Block until every operation submitted to the thread's stream has
    /// completed. A no-op if the stream was never bound.
    pub fn synchronize(&mut self) {
        use crate::ffi::runtime::cudaStreamSynchronize;

        if let Some(stream) = self.stream.get() {
            // SAFETY: stream is this thread's live stream
            unsafe { crate::cuda_call!(cudaStreamSynchronize(stream)) };
        }
    }
}

impl Drop for CudaThreadContext {
    fn drop(&mut self) {
        // Handles and stream first; the workspace pool member drains
        // afterwards in its own Drop.
        self.release_native_handles();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_void;

    fn fake_handle(v: usize) -> *mut c_void {
        v as *mut c_void
    }

    #[test]
    fn lazy_handle_binds_exactly_once() {
        let mut slot: LazyHandle<*mut c_void> = LazyHandle::unbound();
        assert!(!slot.is_bound());
        assert_eq!(slot.get(), None);

        let mut binds = 0;
        let first = slot.get_or_bind_with(|| {
            binds += 1;
            fake_handle(0xA)
        });
        let second = slot.get_or_bind_with(|| {
            binds += 1;
            fake_handle(0xB)
        });

        assert_eq!(binds, 1);
        assert_eq!(first, second);
        assert_eq!(slot.get(), Some(fake_handle(0xA)));
    }

    #[test]
    fn take_is_the_only_way_back_to_unbound() {
        let mut slot: LazyHandle<*mut c_void> = LazyHandle::unbound();
        slot.get_or_bind_with(|| fake_handle(0x1));
        assert!(slot.is_bound());

        assert_eq!(slot.take(), Some(fake_handle(0x1)));
        assert!(!slot.is_bound());
        assert_eq!(slot.take(), None);

        // Rebind after take is a fresh guarded transition
        let rebound = slot.get_or_bind_with(|| fake_handle(0x2));
        assert_eq!(rebound, fake_handle(0x2));
    }
}
