//! Build script for CUDA toolkit linkage.
//!
//! Emits link directives for the four native libraries this crate binds
//! (`cuda`, `cudart`, `cublas`, `cusparse`). No device code is compiled
//! here; kernels live in the crates that own them.
//!
//! # Environment Variables
//!
//! - `CUDA_PATH`: Path to the CUDA toolkit (auto-detected if not set)

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=CUDA_PATH");

    // Only link the toolkit when the cuda feature is enabled; host-only
    // builds must not require a CUDA installation.
    #[cfg(feature = "cuda")]
    link_cuda_toolkit();
}

#[cfg(feature = "cuda")]
fn link_cuda_toolkit() {
    use std::env;
    use std::path::PathBuf;

    let mut search_roots: Vec<PathBuf> = Vec::new();

    if let Ok(cuda_path) = env::var("CUDA_PATH") {
        search_roots.push(PathBuf::from(cuda_path));
    }

    // Common CUDA installation prefixes
    for prefix in ["/usr/local/cuda", "/opt/cuda"] {
        search_roots.push(PathBuf::from(prefix));
    }

    for root in &search_roots {
        for lib_dir in ["lib64", "lib", "lib/x86_64-linux-gnu"] {
            let dir = root.join(lib_dir);
            if dir.exists() {
                println!("cargo:rustc-link-search=native={}", dir.display());
            }
        }
        // WSL2 and driver-only installs keep libcuda in a stubs directory
        let stubs = root.join("lib64/stubs");
        if stubs.exists() {
            println!("cargo:rustc-link-search=native={}", stubs.display());
        }
    }

    println!("cargo:rustc-link-lib=cuda");
    println!("cargo:rustc-link-lib=cudart");
    println!("cargo:rustc-link-lib=cublas");
    println!("cargo:rustc-link-lib=cusparse");
}
