//! Event-pair timing of stream work.

use cudarc::driver::result as cuda_result;
use cudarc::driver::sys as cuda_sys;

use mixbench_core::error::{DeviceResultExt, Result};

/// Owned `CUevent`, destroyed on drop.
pub struct CudaEvent {
    event: cuda_sys::CUevent,
}

impl CudaEvent {
    /// Needs a current context.
    pub fn new() -> Result<Self> {
        let event = cuda_result::event::create(cuda_sys::CUevent_flags::CU_EVENT_DEFAULT)
            .or_resource("cuEventCreate")?;
        Ok(Self { event })
    }

    /// # Safety
    ///
    /// `stream` is live in the current context.
    pub unsafe fn record(&self, stream: cuda_sys::CUstream) -> Result<()> {
        cuda_result::event::record(self.event, stream).or_launch("cuEventRecord")
    }

    /// # Safety
    ///
    /// Called after [`CudaEvent::record`].
    pub unsafe fn synchronize(&self) -> Result<()> {
        cuda_result::event::synchronize(self.event).or_launch("cuEventSynchronize")
    }

    /// # Safety
    ///
    /// Both events are recorded and complete.
    pub unsafe fn elapsed_since(&self, start: &CudaEvent) -> Result<f32> {
        cuda_result::event::elapsed(start.event, self.event).or_launch("cuEventElapsedTime")
    }
}

impl Drop for CudaEvent {
    fn drop(&mut self) {
        unsafe {
            let _ = cuda_result::event::destroy(self.event);
        }
    }
}

/// Start and stop events around one submission.
pub struct EventTimer {
    start: CudaEvent,
    stop: CudaEvent,
}

impl EventTimer {
    /// Create both events.
    pub fn new() -> Result<Self> {
        Ok(Self {
            start: CudaEvent::new()?,
            stop: CudaEvent::new()?,
        })
    }

    /// Device milliseconds spent on what `enqueue` submits; waits for it.
    ///
    /// Keep host work out of `enqueue`: it runs between the two records.
    ///
    /// # Safety
    ///
    /// `enqueue` submits to `stream`, which is live in the current context.
    pub unsafe fn time<F>(&self, stream: cuda_sys::CUstream, enqueue: F) -> Result<f64>
    where
        F: FnOnce() -> Result<()>,
    {
        self.start.record(stream)?;
        enqueue()?;
        self.stop.record(stream)?;
        self.stop.synchronize()?;
        let ms = self.stop.elapsed_since(&self.start)?;
        Ok(ms as f64)
    }
}
