//! CUDA implementation of the benchmark device.

use std::sync::Arc;

use cudarc::driver::sys::CUdevice_attribute;
use cudarc::driver::{
    CudaContext, CudaFunction, CudaModule, CudaSlice, CudaStream, LaunchConfig, PushKernelArg,
};
use tracing::{debug, info};

use mixbench_core::device::{ComputeDevice, KernelLaunch};
use mixbench_core::error::{DeviceResultExt, MixbenchError, Result};
use mixbench_core::template::KernelSpec;
use mixbench_core::types::Seed;

use crate::compile::compile_variant;
use crate::timer::EventTimer;

/// A loaded kernel variant.
pub struct CudaKernel {
    name: String,
    function: CudaFunction,
    // Keeps the module loaded while the function is in use.
    _module: Arc<CudaModule>,
}

impl CudaKernel {
    /// Variant name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A CUDA device with one in-order stream.
pub struct CudaDevice {
    context: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    ordinal: usize,
    name: String,
    compute_capability: (i32, i32),
}

impl CudaDevice {
    /// Open device `ordinal` and its default stream.
    pub fn new(ordinal: usize) -> Result<Self> {
        let context = CudaContext::new(ordinal).or_resource("cuCtxCreate")?;
        let name = context.name().or_resource("cuDeviceGetName")?;
        let major = context
            .attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR)
            .or_resource("cuDeviceGetAttribute")?;
        let minor = context
            .attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR)
            .or_resource("cuDeviceGetAttribute")?;
        let compute_capability = (major, minor);
        let stream = context.default_stream();

        info!(
            "Opened CUDA device {}: {} (sm_{}{})",
            ordinal, name, compute_capability.0, compute_capability.1
        );

        Ok(Self {
            context,
            stream,
            ordinal,
            name,
            compute_capability,
        })
    }

    /// Device ordinal.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Compute capability (major, minor).
    pub fn compute_capability(&self) -> (i32, i32) {
        self.compute_capability
    }
}

impl ComputeDevice for CudaDevice {
    type Kernel = CudaKernel;
    type Buffer = CudaSlice<f64>;

    fn name(&self) -> String {
        self.name.clone()
    }

    fn alloc_buffer(&self, elements: usize) -> Result<CudaSlice<f64>> {
        // SAFETY: contents are written by zero_fill before any launch reads them.
        let buffer = unsafe { self.stream.alloc::<f64>(elements) }.or_resource("cuMemAlloc")?;
        debug!("Allocated {} bytes of device memory", elements * 8);
        Ok(buffer)
    }

    fn zero_fill(&self, buffer: &mut CudaSlice<f64>) -> Result<()> {
        let zeros = vec![0.0f64; buffer.len()];
        self.stream
            .memcpy_htod(&zeros, buffer)
            .or_resource("cuMemcpyHtoD")?;
        self.stream.synchronize().or_resource("cuStreamSynchronize")
    }

    fn compile(&self, spec: &KernelSpec) -> Result<CudaKernel> {
        let ptx = compile_variant(spec)?;
        let module = self.context.load_module(ptx).or_resource("cuModuleLoadData")?;
        let function = module
            .load_function(spec.entry_point())
            .or_resource("cuModuleGetFunction")?;
        Ok(CudaKernel {
            name: spec.name(),
            function,
            _module: module,
        })
    }

    fn launch_timed(
        &self,
        kernel: &CudaKernel,
        launch: &KernelLaunch<'_>,
        buffer: &mut CudaSlice<f64>,
    ) -> Result<f64> {
        self.context.bind_to_thread().or_launch("cuCtxSetCurrent")?;
        let timer = EventTimer::new()?;
        let cfg = LaunchConfig {
            grid_dim: (launch.geometry.blocks(), 1, 1),
            block_dim: (launch.geometry.block_size, 1, 1),
            shared_mem_bytes: 0,
        };

        let seed = launch.seed;
        let mut builder = self.stream.launch_builder(&kernel.function);
        match &seed {
            Seed::Int(v) => builder.arg(v),
            Seed::Float(v) => builder.arg(v),
            Seed::Double(v) => builder.arg(v),
        };
        builder.arg(&mut *buffer);

        // SAFETY: the timer's events and the launch share this stream, and
        // the argument list matches benchmark_func(class_T seed, class_T *g_data)
        // for the element type the variant was specialized with.
        let elapsed_ms = unsafe {
            timer.time(self.stream.cu_stream(), || {
                builder.launch(cfg).map(|_| ()).or_launch("cuLaunchKernel")
            })?
        };
        debug!("{} ran in {:.3} ms", kernel.name, elapsed_ms);

        Ok(elapsed_ms)
    }

    fn read_back(&self, buffer: &CudaSlice<f64>, output: &mut [f64]) -> Result<()> {
        if output.len() > buffer.len() {
            return Err(MixbenchError::launch(
                "cuMemcpyDtoH",
                format!(
                    "output holds {} elements, buffer {}",
                    output.len(),
                    buffer.len()
                ),
            ));
        }
        let view = buffer.slice(0..output.len());
        self.stream
            .memcpy_dtoh(&view, output)
            .or_launch("cuMemcpyDtoH")?;
        self.stream.synchronize().or_launch("cuStreamSynchronize")
    }
}
