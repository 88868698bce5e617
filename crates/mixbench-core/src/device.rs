//! Uniform device contract: compile a kernel variant, enqueue, time, release.

use crate::error::Result;
use crate::geometry::LaunchGeometry;
use crate::template::KernelSpec;
use crate::types::Seed;

/// Arguments of one kernel launch.
#[derive(Debug, Clone, Copy)]
pub struct KernelLaunch<'a> {
    /// Block and grid dimensions.
    pub geometry: &'a LaunchGeometry,
    /// Scalar seed argument.
    pub seed: Seed,
}

/// A compute device the sweep can drive.
///
/// Implementations own a single in-order queue. Every method blocks until
/// the device has finished the requested work.
pub trait ComputeDevice {
    /// Compiled, invokable kernel variant.
    type Kernel;
    /// Device-resident array of 8-byte slots.
    type Buffer;

    /// Human-readable device name.
    fn name(&self) -> String;

    /// Allocate a buffer of `elements` 8-byte slots.
    fn alloc_buffer(&self, elements: usize) -> Result<Self::Buffer>;

    /// Zero the buffer with a host-side write, without launching a kernel.
    fn zero_fill(&self, buffer: &mut Self::Buffer) -> Result<()>;

    /// Build one kernel variant.
    ///
    /// Fails with [`MixbenchError::Compile`](crate::error::MixbenchError::Compile)
    /// carrying the full toolchain log.
    fn compile(&self, spec: &KernelSpec) -> Result<Self::Kernel>;

    /// Launch `kernel` once and return its device-measured duration in
    /// milliseconds.
    ///
    /// The duration covers only the device execution of this launch.
    fn launch_timed(
        &self,
        kernel: &Self::Kernel,
        launch: &KernelLaunch<'_>,
        buffer: &mut Self::Buffer,
    ) -> Result<f64>;

    /// Copy the whole buffer back to host memory.
    fn read_back(&self, buffer: &Self::Buffer, output: &mut [f64]) -> Result<()>;

    /// Release a compiled variant.
    fn release_kernel(&self, kernel: Self::Kernel) -> Result<()> {
        drop(kernel);
        Ok(())
    }

    /// Release the buffer.
    fn release_buffer(&self, buffer: Self::Buffer) -> Result<()> {
        drop(buffer);
        Ok(())
    }
}
