//! Uniform checking protocol for the four native API families.
//!
//! Native GPU calls fail far from the logical point of error and leave
//! no recoverable local remedy, so every raw result funnels through one
//! of four checks that either returns silently or takes the process
//! down with a diagnostic naming the exact call that failed. Retry and
//! backoff belong to the scheduling layer above; a half-failed native
//! call sequence cannot be resumed.
//!
//! Call sites use the `*_call!` macros, which capture the source
//! expression for the diagnostic:
//!
//! ```ignore
//! unsafe { cuda_call!(cudaStreamCreate(&mut stream)) };
//! unsafe { cublas_call!(cublasSetStream_v2(handle, stream)) };
//! ```
//!
//! The only code that may bypass the protocol is `Drop` teardown, which
//! must never panic and logs failures instead.

use tracing::error;

use crate::ffi::cublas::{cublasStatus_t, CUBLAS_STATUS_SUCCESS};
use crate::ffi::cusparse::{cusparseStatus_t, CUSPARSE_STATUS_SUCCESS};
use crate::ffi::driver::{self, CUresult, CUDA_SUCCESS};
use crate::ffi::runtime::{self, cudaError_t, cudaErrorCudartUnloading, cudaSuccess};

/// Check a CUDA Driver API result.
///
/// Fatal for every code except `CUDA_SUCCESS`. The diagnostic carries
/// the checked expression and the driver's name for the code.
#[track_caller]
pub fn check_driver(result: CUresult, expr: &str) {
    if result != CUDA_SUCCESS {
        fatal(format!(
            "CUDA driver error: {expr} failed: {}",
            driver::error_name(result)
        ));
    }
}

/// Check a CUDA Runtime API result.
///
/// Fatal for every code except `cudaSuccess` and
/// `cudaErrorCudartUnloading`. The latter arises when a call races
/// runtime teardown at process exit; nothing useful can be done about
/// it and it does not indicate a fault in the issued work, so it is
/// tolerated rather than escalated.
#[track_caller]
pub fn check_runtime(result: cudaError_t, expr: &str) {
    if result != cudaSuccess && result != cudaErrorCudartUnloading {
        fatal(format!(
            "CUDA runtime error: {expr} failed: {}",
            runtime::error_string(result)
        ));
    }
}

/// Check a cuSPARSE status.
///
/// Fatal for every code except `CUSPARSE_STATUS_SUCCESS`. cuSPARSE has
/// no message lookup, so the diagnostic carries the raw status value.
#[track_caller]
pub fn check_cusparse(status: cusparseStatus_t, expr: &str) {
    if status != CUSPARSE_STATUS_SUCCESS {
        fatal(format!("cuSPARSE error: {expr} failed with status {status}"));
    }
}

/// Check a cuBLAS status.
///
/// Fatal for every code except `CUBLAS_STATUS_SUCCESS`. cuBLAS has no
/// message lookup, so the diagnostic carries the raw status value.
#[track_caller]
pub fn check_cublas(status: cublasStatus_t, expr: &str) {
    if status != CUBLAS_STATUS_SUCCESS {
        fatal(format!("cuBLAS error: {expr} failed with status {status}"));
    }
}

/// Emit the diagnostic to structured logs, then panic with it.
#[cold]
#[inline(never)]
#[track_caller]
fn fatal(message: String) -> ! {
    error!(target: "spindle_cuda", "{message}");
    panic!("{message}");
}

/// Run a driver call and check its result, capturing the source
/// expression for the diagnostic.
#[macro_export]
macro_rules! cuda_driver_call {
    ($e:expr) => {{
        let __result = $e;
        $crate::check::check_driver(__result, stringify!($e));
    }};
}

/// Run a runtime call and check its result, capturing the source
/// expression for the diagnostic.
#[macro_export]
macro_rules! cuda_call {
    ($e:expr) => {{
        let __result = $e;
        $crate::check::check_runtime(__result, stringify!($e));
    }};
}

/// Run a cuSPARSE call and check its status, capturing the source
/// expression for the diagnostic.
#[macro_export]
macro_rules! cusparse_call {
    ($e:expr) => {{
        let __status = $e;
        $crate::check::check_cusparse(__status, stringify!($e));
    }};
}

/// Run a cuBLAS call and check its status, capturing the source
/// expression for the diagnostic.
#[macro_export]
macro_rules! cublas_call {
    ($e:expr) => {{
        let __status = $e;
        $crate::check::check_cublas(__status, stringify!($e));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::cublas::CUBLAS_STATUS_EXECUTION_FAILED;
    use crate::ffi::cusparse::CUSPARSE_STATUS_ALLOC_FAILED;
    use crate::ffi::driver::CUDA_ERROR_DEINITIALIZED;
    use crate::ffi::runtime::cudaErrorMemoryAllocation;

    #[test]
    fn success_sentinels_do_not_panic() {
        check_driver(CUDA_SUCCESS, "cuInit(0)");
        check_runtime(cudaSuccess, "cudaStreamCreate(&mut s)");
        check_cusparse(CUSPARSE_STATUS_SUCCESS, "cusparseCreate(&mut h)");
        check_cublas(CUBLAS_STATUS_SUCCESS, "cublasCreate_v2(&mut h)");
    }

    #[test]
    fn runtime_tolerates_unloading() {
        // Teardown race: benign, not an error
        check_runtime(cudaErrorCudartUnloading, "cudaStreamDestroy(s)");
    }

    #[test]
    #[should_panic(expected = "cudaMalloc(&mut p, 1024)")]
    fn runtime_failure_names_the_expression() {
        check_runtime(cudaErrorMemoryAllocation, "cudaMalloc(&mut p, 1024)");
    }

    #[test]
    #[should_panic(expected = "out of memory")]
    fn runtime_failure_decodes_the_code() {
        check_runtime(cudaErrorMemoryAllocation, "cudaMalloc(&mut p, 1024)");
    }

    #[test]
    #[should_panic(expected = "cuDeviceGetCount(&mut n)")]
    fn driver_failure_names_the_expression() {
        check_driver(CUDA_ERROR_DEINITIALIZED, "cuDeviceGetCount(&mut n)");
    }

    #[test]
    #[should_panic(expected = "cusparseCreate(&mut h)")]
    fn cusparse_failure_names_the_expression() {
        check_cusparse(CUSPARSE_STATUS_ALLOC_FAILED, "cusparseCreate(&mut h)");
    }

    #[test]
    #[should_panic(expected = "status 2")]
    fn cusparse_failure_carries_the_raw_status() {
        check_cusparse(CUSPARSE_STATUS_ALLOC_FAILED, "cusparseCreate(&mut h)");
    }

    #[test]
    #[should_panic(expected = "cublasSgemm_v2(handle, ..)")]
    fn cublas_failure_names_the_expression() {
        check_cublas(CUBLAS_STATUS_EXECUTION_FAILED, "cublasSgemm_v2(handle, ..)");
    }

    #[test]
    fn macros_stringify_the_checked_expression() {
        fn fake_runtime_call() -> cudaError_t {
            cudaSuccess
        }
        // Success path: evaluates the expression once, checks, no panic
        cuda_call!(fake_runtime_call());

        let panic = std::panic::catch_unwind(|| {
            fn failing_driver_call() -> CUresult {
                CUDA_ERROR_DEINITIALIZED
            }
            cuda_driver_call!(failing_driver_call());
        })
        .expect_err("non-success driver code must panic");
        let message = panic
            .downcast_ref::<String>()
            .expect("diagnostic is a formatted string");
        assert!(message.contains("failing_driver_call()"), "{message}");
        assert!(message.contains("CUDA_ERROR_DEINITIALIZED"), "{message}");
    }

    #[test]
    fn macro_evaluates_expression_exactly_once() {
        let mut calls = 0;
        cublas_call!({
            calls += 1;
            CUBLAS_STATUS_SUCCESS
        });
        assert_eq!(calls, 1);
    }
}
