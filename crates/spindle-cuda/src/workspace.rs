//! Thread-scoped scratch-memory pool.
//!
//! Transient device buffers for kernel launches are requested and
//! returned at high frequency, so freed blocks are cached and reused
//! within the owning thread instead of hitting the device allocator
//! every time. The pool is exclusively owned by one
//! [`crate::context::CudaThreadContext`]; no locking, no sharing.
//!
//! The allocator behind the pool is a seam: production uses
//! [`CudaMalloc`], which routes through the checking protocol (device
//! memory exhaustion is fatal, like every other native failure); tests
//! and host-only builds use [`HostAlloc`].

use std::ffi::c_void;

use tracing::{debug, trace, warn};

use crate::error::{CudaError, CudaResult};

/// Alignment guaranteed for pool blocks, matching the device
/// allocator's own guarantee.
pub const WORKSPACE_ALIGN: usize = 256;

// ============================================================================
// Allocator seam
// ============================================================================

/// Raw block allocation backend for the pool.
///
/// Implementations decide what failure means: [`CudaMalloc`] escalates
/// through the checking protocol, so its `alloc` only ever returns a
/// live pointer.
pub trait DeviceAllocator {
    /// Allocate `nbytes` of memory. `nbytes` is never zero.
    fn alloc(&mut self, nbytes: usize) -> *mut c_void;

    /// Release a block previously returned by `alloc` with the same
    /// `nbytes`.
    fn dealloc(&mut self, ptr: *mut c_void, nbytes: usize);
}

/// Production allocator: `cudaMalloc`/`cudaFree` on the calling
/// thread's current device.
#[cfg(feature = "cuda")]
#[derive(Debug, Default)]
pub struct CudaMalloc;

#[cfg(feature = "cuda")]
impl DeviceAllocator for CudaMalloc {
    fn alloc(&mut self, nbytes: usize) -> *mut c_void {
        use crate::ffi::runtime::cudaMalloc;
        let mut ptr: *mut c_void = std::ptr::null_mut();
        // SAFETY: ptr is a valid out-pointer; nbytes > 0
        unsafe { crate::cuda_call!(cudaMalloc(&mut ptr, nbytes)) };
        ptr
    }

    fn dealloc(&mut self, ptr: *mut c_void, _nbytes: usize) {
        use crate::ffi::runtime::cudaFree;
        // SAFETY: ptr came from cudaMalloc and has not been freed
        unsafe { crate::cuda_call!(cudaFree(ptr)) };
    }
}

/// Host-memory stand-in for builds and tests without a device.
#[derive(Debug, Default)]
pub struct HostAlloc;

impl DeviceAllocator for HostAlloc {
    fn alloc(&mut self, nbytes: usize) -> *mut c_void {
        let layout = std::alloc::Layout::from_size_align(nbytes, WORKSPACE_ALIGN)
            .expect("workspace layout");
        // SAFETY: layout has non-zero size (the pool clamps requests)
        let ptr = unsafe { std::alloc::alloc(layout) };
        assert!(!ptr.is_null(), "host allocation of {nbytes} bytes failed");
        ptr.cast()
    }

    fn dealloc(&mut self, ptr: *mut c_void, nbytes: usize) {
        let layout = std::alloc::Layout::from_size_align(nbytes, WORKSPACE_ALIGN)
            .expect("workspace layout");
        // SAFETY: ptr was allocated by HostAlloc::alloc with this layout
        unsafe { std::alloc::dealloc(ptr.cast(), layout) };
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Caps on how much freed memory the pool retains.
///
/// Blocks released beyond either cap are deallocated immediately
/// instead of cached. Set both caps to zero to disable caching
/// entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspacePoolConfig {
    /// Maximum number of cached blocks.
    pub max_cached_blocks: usize,
    /// Maximum total bytes held in the cache.
    pub max_cached_bytes: usize,
}

impl Default for WorkspacePoolConfig {
    fn default() -> Self {
        Self {
            max_cached_blocks: 32,
            max_cached_bytes: 1 << 30, // 1 GiB
        }
    }
}

impl WorkspacePoolConfig {
    /// Validate configuration parameters.
    ///
    /// # Errors
    ///
    /// Returns `CudaError::InvalidConfig` if exactly one cap is zero:
    /// one cap would disable caching while the other permits it, which
    /// is always a mistyped intent.
    pub fn validate(&self) -> CudaResult<()> {
        if (self.max_cached_blocks == 0) != (self.max_cached_bytes == 0) {
            return Err(CudaError::InvalidConfig(format!(
                "inconsistent cache caps: max_cached_blocks={}, max_cached_bytes={}; \
                 set both to zero to disable caching",
                self.max_cached_blocks, self.max_cached_bytes
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Pool
// ============================================================================

/// A scratch block handed out by [`WorkspacePool::acquire`].
///
/// The block stays alive until returned through
/// [`WorkspacePool::release`]; dropping it without releasing leaks the
/// allocation (the pool warns about the imbalance on teardown).
#[derive(Debug)]
pub struct Workspace {
    ptr: *mut c_void,
    capacity: usize,
}

impl Workspace {
    /// Device (or host, under [`HostAlloc`]) pointer to the block.
    #[inline]
    #[must_use]
    pub fn ptr(&self) -> *mut c_void {
        self.ptr
    }

    /// Usable size of the block; at least the requested size.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Caching scratch allocator scoped to one thread.
pub struct WorkspacePool {
    allocator: Box<dyn DeviceAllocator>,
    /// Released blocks available for reuse.
    free: Vec<Workspace>,
    cached_bytes: usize,
    outstanding: usize,
    config: WorkspacePoolConfig,
}

impl WorkspacePool {
    /// Pool with the default configuration over the build's natural
    /// allocator: `cudaMalloc` with the `cuda` feature, host memory
    /// without.
    #[must_use]
    pub fn new() -> Self {
        #[cfg(feature = "cuda")]
        let allocator: Box<dyn DeviceAllocator> = Box::new(CudaMalloc);
        #[cfg(not(feature = "cuda"))]
        let allocator: Box<dyn DeviceAllocator> = Box::new(HostAlloc);

        Self {
            allocator,
            free: Vec::new(),
            cached_bytes: 0,
            outstanding: 0,
            config: WorkspacePoolConfig::default(),
        }
    }

    /// Pool over an explicit allocator and configuration.
    ///
    /// # Errors
    ///
    /// Returns `CudaError::InvalidConfig` if the configuration fails
    /// [`WorkspacePoolConfig::validate`].
    pub fn with_allocator(
        allocator: Box<dyn DeviceAllocator>,
        config: WorkspacePoolConfig,
    ) -> CudaResult<Self> {
        config.validate()?;
        Ok(Self {
            allocator,
            free: Vec::new(),
            cached_bytes: 0,
            outstanding: 0,
            config,
        })
    }

    /// Hand out a block of at least `nbytes`.
    ///
    /// Reuses the smallest cached block that fits; allocates a fresh
    /// block otherwise. Zero-sized requests still get a real block so
    /// every `Workspace` carries a live pointer.
    pub fn acquire(&mut self, nbytes: usize) -> Workspace {
        let nbytes = nbytes.max(1);
        self.outstanding += 1;

        // Best fit over the free list
        let best = self
            .free
            .iter()
            .enumerate()
            .filter(|(_, ws)| ws.capacity >= nbytes)
            .min_by_key(|(_, ws)| ws.capacity)
            .map(|(i, _)| i);

        if let Some(i) = best {
            let ws = self.free.swap_remove(i);
            self.cached_bytes -= ws.capacity;
            trace!(requested = nbytes, capacity = ws.capacity, "workspace cache hit");
            return ws;
        }

        debug!(nbytes, "workspace pool growing");
        let ptr = self.allocator.alloc(nbytes);
        Workspace {
            ptr,
            capacity: nbytes,
        }
    }

    /// Return a block to the pool.
    ///
    /// Cached for reuse while within the configured caps; deallocated
    /// immediately otherwise.
    pub fn release(&mut self, ws: Workspace) {
        self.outstanding = self.outstanding.saturating_sub(1);

        let fits_count = self.free.len() < self.config.max_cached_blocks;
        let fits_bytes = self.cached_bytes + ws.capacity <= self.config.max_cached_bytes;
        if fits_count && fits_bytes {
            self.cached_bytes += ws.capacity;
            self.free.push(ws);
        } else {
            trace!(capacity = ws.capacity, "workspace cache full, freeing block");
            self.allocator.dealloc(ws.ptr, ws.capacity);
        }
    }

    /// Deallocate every cached block. Outstanding blocks are untouched.
    pub fn drain(&mut self) {
        for ws in self.free.drain(..) {
            self.allocator.dealloc(ws.ptr, ws.capacity);
        }
        self.cached_bytes = 0;
    }

    /// Number of blocks handed out and not yet released.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Number of blocks currently cached for reuse.
    #[must_use]
    pub fn cached_blocks(&self) -> usize {
        self.free.len()
    }

    /// Total bytes currently cached for reuse.
    #[must_use]
    pub fn cached_bytes(&self) -> usize {
        self.cached_bytes
    }
}

impl Default for WorkspacePool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WorkspacePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspacePool")
            .field("cached_blocks", &self.free.len())
            .field("cached_bytes", &self.cached_bytes)
            .field("outstanding", &self.outstanding)
            .field("config", &self.config)
            .finish()
    }
}

impl Drop for WorkspacePool {
    fn drop(&mut self) {
        if self.outstanding > 0 {
            warn!(
                outstanding = self.outstanding,
                "workspace pool dropped with unreleased blocks; their memory is leaked"
            );
        }
        self.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Allocator that counts live allocations, backed by host memory.
    struct CountingAlloc {
        inner: HostAlloc,
        stats: Arc<Mutex<Stats>>,
    }

    #[derive(Default)]
    struct Stats {
        allocs: usize,
        frees: usize,
    }

    impl CountingAlloc {
        fn new() -> (Self, Arc<Mutex<Stats>>) {
            let stats = Arc::new(Mutex::new(Stats::default()));
            (
                Self {
                    inner: HostAlloc,
                    stats: Arc::clone(&stats),
                },
                stats,
            )
        }
    }

    impl DeviceAllocator for CountingAlloc {
        fn alloc(&mut self, nbytes: usize) -> *mut c_void {
            self.stats.lock().unwrap().allocs += 1;
            self.inner.alloc(nbytes)
        }

        fn dealloc(&mut self, ptr: *mut c_void, nbytes: usize) {
            self.stats.lock().unwrap().frees += 1;
            self.inner.dealloc(ptr, nbytes)
        }
    }

    fn counting_pool(config: WorkspacePoolConfig) -> (WorkspacePool, Arc<Mutex<Stats>>) {
        let (alloc, stats) = CountingAlloc::new();
        let pool = WorkspacePool::with_allocator(Box::new(alloc), config).unwrap();
        (pool, stats)
    }

    #[test]
    fn released_blocks_are_reused() {
        let (mut pool, stats) = counting_pool(WorkspacePoolConfig::default());

        let ws = pool.acquire(1024);
        let ptr = ws.ptr();
        pool.release(ws);

        // Smaller request fits in the cached 1024-byte block
        let ws = pool.acquire(512);
        assert_eq!(ws.ptr(), ptr);
        assert_eq!(ws.capacity(), 1024);
        assert_eq!(stats.lock().unwrap().allocs, 1);
        pool.release(ws);
    }

    #[test]
    fn best_fit_prefers_the_smallest_sufficient_block() {
        let (mut pool, _stats) = counting_pool(WorkspacePoolConfig::default());

        let big = pool.acquire(4096);
        let small = pool.acquire(1024);
        let small_ptr = small.ptr();
        pool.release(big);
        pool.release(small);

        let ws = pool.acquire(512);
        assert_eq!(ws.ptr(), small_ptr);
        pool.release(ws);
    }

    #[test]
    fn block_cap_frees_excess_releases() {
        let (mut pool, stats) = counting_pool(WorkspacePoolConfig {
            max_cached_blocks: 1,
            max_cached_bytes: 1 << 20,
        });

        let a = pool.acquire(64);
        let b = pool.acquire(64);
        pool.release(a);
        pool.release(b); // over the block cap: freed immediately

        assert_eq!(pool.cached_blocks(), 1);
        assert_eq!(stats.lock().unwrap().frees, 1);
    }

    #[test]
    fn byte_cap_frees_excess_releases() {
        let (mut pool, stats) = counting_pool(WorkspacePoolConfig {
            max_cached_blocks: 8,
            max_cached_bytes: 100,
        });

        let a = pool.acquire(80);
        let b = pool.acquire(80);
        pool.release(a);
        pool.release(b); // 160 bytes cached would exceed the byte cap

        assert_eq!(pool.cached_blocks(), 1);
        assert_eq!(pool.cached_bytes(), 80);
        assert_eq!(stats.lock().unwrap().frees, 1);
    }

    #[test]
    fn drain_frees_every_cached_block() {
        let (mut pool, stats) = counting_pool(WorkspacePoolConfig::default());

        let a = pool.acquire(128);
        let b = pool.acquire(256);
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.cached_blocks(), 2);

        pool.drain();
        assert_eq!(pool.cached_blocks(), 0);
        assert_eq!(pool.cached_bytes(), 0);
        let s = stats.lock().unwrap();
        assert_eq!(s.allocs, 2);
        assert_eq!(s.frees, 2);
    }

    #[test]
    fn drop_balances_the_allocator() {
        let (mut pool, stats) = counting_pool(WorkspacePoolConfig::default());
        let ws = pool.acquire(512);
        pool.release(ws);
        drop(pool);

        let s = stats.lock().unwrap();
        assert_eq!(s.allocs, s.frees);
    }

    #[test]
    fn zero_sized_requests_get_a_live_block() {
        let (mut pool, _stats) = counting_pool(WorkspacePoolConfig::default());
        let ws = pool.acquire(0);
        assert!(!ws.ptr().is_null());
        assert!(ws.capacity() >= 1);
        pool.release(ws);
    }

    #[test]
    fn outstanding_tracks_unreleased_blocks() {
        let (mut pool, _stats) = counting_pool(WorkspacePoolConfig::default());
        let a = pool.acquire(16);
        let b = pool.acquire(16);
        assert_eq!(pool.outstanding(), 2);
        pool.release(a);
        assert_eq!(pool.outstanding(), 1);
        pool.release(b);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn inconsistent_caps_are_rejected() {
        let bad = WorkspacePoolConfig {
            max_cached_blocks: 0,
            max_cached_bytes: 1 << 20,
        };
        assert!(bad.validate().is_err());

        let disabled = WorkspacePoolConfig {
            max_cached_blocks: 0,
            max_cached_bytes: 0,
        };
        assert!(disabled.validate().is_ok());

        let (mut pool, stats) = counting_pool(disabled);
        let ws = pool.acquire(32);
        pool.release(ws); // caching disabled: freed immediately
        assert_eq!(pool.cached_blocks(), 0);
        assert_eq!(stats.lock().unwrap().frees, 1);
    }
}
