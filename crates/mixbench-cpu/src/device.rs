//! Host reference device.

use std::time::Instant;

use tracing::{debug, info};

use mixbench_core::device::{ComputeDevice, KernelLaunch};
use mixbench_core::error::{DeviceResultExt, MixbenchError, Result};
use mixbench_core::template::{KernelParams, KernelSpec};
use mixbench_core::types::ElementType;

use crate::kernel::{run_grid, KernelShape, Scalar, REGISTERS};

/// A variant "compiled" for the host: its resolved constants.
#[derive(Debug, Clone)]
pub struct HostKernel {
    name: String,
    params: KernelParams,
    shape: KernelShape,
}

impl HostKernel {
    /// Variant name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variant parameters.
    pub fn params(&self) -> &KernelParams {
        &self.params
    }
}

/// Executes kernel variants on the calling thread.
///
/// Launches are sequential over blocks and threads, so timings reflect
/// single-core throughput. Useful as a functional reference and on machines
/// without a GPU.
#[derive(Debug, Default)]
pub struct HostDevice;

impl HostDevice {
    /// Create a host device.
    pub fn new() -> Self {
        info!("Initializing host reference device");
        Self
    }
}

fn launch_as<T: Scalar>(
    kernel: &HostKernel,
    launch: &KernelLaunch<'_>,
    buffer: &mut [f64],
) -> Result<()> {
    let seed = T::from_seed(launch.seed).ok_or_else(|| {
        MixbenchError::launch(
            "bind seed",
            format!("{:?} does not match {}", launch.seed, kernel.name),
        )
    })?;
    let data: &mut [T] = bytemuck::cast_slice_mut(buffer);
    if data.len() < kernel.shape.required_len() {
        return Err(MixbenchError::launch(
            "bind buffer",
            format!(
                "{} needs {} elements, buffer holds {}",
                kernel.name,
                kernel.shape.required_len(),
                data.len()
            ),
        ));
    }
    run_grid(&kernel.shape, launch.geometry.blocks() as usize, seed, data);
    Ok(())
}

impl ComputeDevice for HostDevice {
    type Kernel = HostKernel;
    type Buffer = Vec<f64>;

    fn name(&self) -> String {
        "Host reference device".to_string()
    }

    fn alloc_buffer(&self, elements: usize) -> Result<Vec<f64>> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(elements)
            .or_resource("host buffer allocation")?;
        buffer.resize(elements, 0.0);
        debug!("Allocated {} bytes", elements * std::mem::size_of::<f64>());
        Ok(buffer)
    }

    fn zero_fill(&self, buffer: &mut Vec<f64>) -> Result<()> {
        buffer.fill(0.0);
        Ok(())
    }

    fn compile(&self, spec: &KernelSpec) -> Result<HostKernel> {
        let name = spec.name();
        let params = *spec.params();
        if !spec.source().contains(spec.entry_point()) {
            return Err(MixbenchError::compile(
                name,
                format!("error: entry point '{}' not found", spec.entry_point()),
            ));
        }
        if params.regblock_size as usize != REGISTERS {
            return Err(MixbenchError::compile(
                name,
                format!(
                    "error: REGBLOCK_SIZE {} unsupported, kernel rotates {} registers",
                    params.regblock_size, REGISTERS
                ),
            ));
        }
        debug!("Prepared host kernel {}", name);
        Ok(HostKernel {
            name,
            shape: KernelShape::from_params(&params),
            params,
        })
    }

    fn launch_timed(
        &self,
        kernel: &HostKernel,
        launch: &KernelLaunch<'_>,
        buffer: &mut Vec<f64>,
    ) -> Result<f64> {
        if launch.geometry.block_size != kernel.params.block_size {
            return Err(MixbenchError::launch(
                "launch geometry",
                format!(
                    "block size {} differs from compiled {}",
                    launch.geometry.block_size, kernel.params.block_size
                ),
            ));
        }
        if launch.geometry.grid_size != kernel.params.grid_size {
            return Err(MixbenchError::launch(
                "launch geometry",
                format!(
                    "grid size {} differs from compiled {}",
                    launch.geometry.grid_size, kernel.params.grid_size
                ),
            ));
        }

        let start = Instant::now();
        match kernel.params.element_type {
            ElementType::Int => launch_as::<i32>(kernel, launch, buffer)?,
            ElementType::Float => launch_as::<f32>(kernel, launch, buffer)?,
            ElementType::Double => launch_as::<f64>(kernel, launch, buffer)?,
        }
        let elapsed = start.elapsed();

        Ok(elapsed.as_secs_f64() * 1e3)
    }

    fn read_back(&self, buffer: &Vec<f64>, output: &mut [f64]) -> Result<()> {
        let src = buffer.get(..output.len()).ok_or_else(|| {
            MixbenchError::launch(
                "read back",
                format!(
                    "output holds {} elements, buffer {}",
                    output.len(),
                    buffer.len()
                ),
            )
        })?;
        output.copy_from_slice(src);
        Ok(())
    }
}
