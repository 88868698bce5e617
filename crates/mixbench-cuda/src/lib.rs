//! CUDA backend for mixbench.
//!
//! Kernel variants are compiled at runtime with NVRTC, launched on a single
//! in-order stream and timed with a pair of CUDA events recorded around each
//! launch.
//!
//! # Feature Flags
//!
//! - `cuda` - Enables the CUDA device (requires the CUDA toolkit)
//!
//! Without the `cuda` feature only device discovery is available and it
//! always reports no devices.

#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "cuda")]
mod compile;
#[cfg(feature = "cuda")]
mod device;
#[cfg(feature = "cuda")]
pub mod timer;

#[cfg(feature = "cuda")]
pub use compile::compile_variant;
#[cfg(feature = "cuda")]
pub use device::{CudaDevice, CudaKernel};

/// Check if a CUDA device is present.
pub fn is_cuda_available() -> bool {
    cuda_device_count() > 0
}

/// Number of CUDA devices.
pub fn cuda_device_count() -> usize {
    #[cfg(feature = "cuda")]
    {
        // cudarc panics if the driver library cannot be loaded
        std::panic::catch_unwind(|| {
            cudarc::driver::CudaContext::device_count().unwrap_or(0) as usize
        })
        .unwrap_or(0)
    }
    #[cfg(not(feature = "cuda"))]
    {
        0
    }
}
