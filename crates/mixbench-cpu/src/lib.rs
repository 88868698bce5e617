//! Host reference device for mixbench.
//!
//! Runs the benchmark kernel's per-thread algorithm on the CPU so the sweep,
//! the report and the kernel's memory-access pattern can be exercised
//! without a GPU.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod kernel;

pub use device::{HostDevice, HostKernel};
