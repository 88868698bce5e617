//! Core of the mixbench compute/memory trade-off micro-benchmark.
//!
//! A single kernel template is specialized into one variant per
//! (element type, memory ratio) pair. Every variant runs the same number of
//! loop iterations over the same buffer; only the share of memory slots in
//! the unrolled body changes. Sweeping the ratio from all-memory down to
//! all-compute traces a device's roofline.
//!
//! # Features
//!
//! - **Template specialization**: `#define` prelude rendered from [`KernelParams`]
//! - **Device contract**: [`ComputeDevice`] implemented by the host and CUDA backends
//! - **Sweep control**: [`SweepController`] precompiles, warms up, times and releases
//! - **Reporting**: spreadsheet-ready text table or JSON lines
//!
//! # Example
//!
//! ```ignore
//! use mixbench_core::prelude::*;
//!
//! let template = KernelTemplate::from_file("kernels/mix_kernels.cu")?;
//! let elements = 8 * 1024 * 1024;
//! let mut output = vec![0.0f64; elements];
//! let mut table = TableEmitter::new(std::io::stdout());
//!
//! let report = run_mix_benchmark(
//!     &device,
//!     &template,
//!     &mut output,
//!     elements,
//!     BenchConfig::default(),
//!     SweepOptions::default(),
//!     &mut table,
//! )?;
//! println!("{:?}", report.peak(ElementType::Float));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod device;
pub mod error;
pub mod geometry;
pub mod metrics;
pub mod report;
pub mod sweep;
pub mod template;
pub mod types;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{BenchConfig, BenchConfigBuilder, SweepOptions};
    pub use crate::device::{ComputeDevice, KernelLaunch};
    pub use crate::error::{DeviceResultExt, MixbenchError, Result};
    pub use crate::geometry::LaunchGeometry;
    pub use crate::metrics::{Measurement, SweepRow, Timing, WorkPerLaunch, SENTINEL};
    pub use crate::report::{JsonLinesEmitter, ReportHeader, ResultEmitter, TableEmitter};
    pub use crate::sweep::{run_mix_benchmark, Peak, SweepController, SweepReport, SweepState};
    pub use crate::template::{KernelParams, KernelSpec, KernelTemplate};
    pub use crate::types::{AddressingMode, ElementType, RatioPoint, Seed};
}

// Re-exports
pub use config::{BenchConfig, SweepOptions};
pub use device::{ComputeDevice, KernelLaunch};
pub use error::{MixbenchError, Result};
pub use geometry::LaunchGeometry;
pub use sweep::{run_mix_benchmark, SweepController, SweepReport};
pub use template::{KernelParams, KernelSpec, KernelTemplate};
pub use types::{AddressingMode, ElementType, RatioPoint, Seed};
