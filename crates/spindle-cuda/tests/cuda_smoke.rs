//! Smoke test against real hardware.
//!
//! Requires the `cuda` feature and a visible device; skips itself
//! cleanly on hosts without one.

#![cfg(feature = "cuda")]

use spindle_cuda::context::CudaThreadContext;
use spindle_cuda::is_gpu_available;

#[test]
fn bind_use_and_reset_one_thread_context() {
    if !is_gpu_available() {
        eprintln!("no CUDA device visible, skipping");
        return;
    }

    CudaThreadContext::with(|ctx| {
        // First bind creates the stream and both sessions
        let stream = ctx.stream();
        assert!(!stream.is_null());

        let cusparse = ctx.cusparse();
        let cublas = ctx.cublas();
        assert!(!cusparse.is_null());
        assert!(!cublas.is_null());

        // Stable across repeated access
        assert_eq!(ctx.stream(), stream);
        assert_eq!(ctx.cusparse(), cusparse);
        assert_eq!(ctx.cublas(), cublas);

        // Scratch memory round-trips through the pool
        let ws = ctx.workspace.acquire(1 << 20);
        assert!(!ws.ptr().is_null());
        ctx.workspace.release(ws);
        assert_eq!(ctx.workspace.cached_blocks(), 1);

        ctx.synchronize();

        // Explicit rebind: everything unbound, next access rebinds
        ctx.reset();
        assert!(!ctx.stream.is_bound());
        assert!(!ctx.cusparse.is_bound());
        assert!(!ctx.cublas.is_bound());
        let rebound = ctx.stream();
        assert!(!rebound.is_null());
    });
}

#[test]
fn two_threads_bind_independent_streams() {
    if !is_gpu_available() {
        eprintln!("no CUDA device visible, skipping");
        return;
    }

    let main_stream = CudaThreadContext::with(|ctx| ctx.stream() as usize);

    let other_stream = std::thread::spawn(|| {
        CudaThreadContext::with(|ctx| ctx.stream() as usize)
    })
    .join()
    .unwrap();

    assert_ne!(main_stream, other_stream);
}
