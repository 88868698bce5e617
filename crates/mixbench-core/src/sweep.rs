//! Ratio sweep controller.
//!
//! Lifecycle: `Idle -> WarmedUp -> Measuring(ratio)... -> Drained -> Released`.
//! All variants are compiled before the warmup launch, so build latency never
//! reaches a timed launch.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{BenchConfig, SweepOptions};
use crate::device::{ComputeDevice, KernelLaunch};
use crate::error::{MixbenchError, Result};
use crate::geometry::LaunchGeometry;
use crate::metrics::{SweepRow, Timing, WorkPerLaunch};
use crate::report::{ReportHeader, ResultEmitter};
use crate::template::{KernelParams, KernelSpec, KernelTemplate};
use crate::types::{ElementType, RatioPoint};

/// Sweep lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    /// Nothing launched yet.
    Idle,
    /// Warmup launch done.
    WarmedUp,
    /// Measuring the given ratio point.
    Measuring(RatioPoint),
    /// Buffer copied back to host.
    Drained,
    /// Variants and buffer released.
    Released,
}

impl fmt::Display for SweepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepState::Idle => f.write_str("Idle"),
            SweepState::WarmedUp => f.write_str("WarmedUp"),
            SweepState::Measuring(ratio) => write!(f, "Measuring({})", ratio.memory_slots()),
            SweepState::Drained => f.write_str("Drained"),
            SweepState::Released => f.write_str("Released"),
        }
    }
}

/// Key of a compiled variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantKey {
    /// Element type.
    pub element_type: ElementType,
    /// Ratio point.
    pub ratio: RatioPoint,
}

/// Compiled variants keyed by (element type, ratio).
///
/// Populated once during precompilation, read-only afterwards, and consumed
/// by [`KernelTable::release`].
pub struct KernelTable<K> {
    variants: HashMap<VariantKey, K>,
}

impl<K> KernelTable<K> {
    /// Compile every ratio point for each enabled element type.
    pub fn compile<D>(
        device: &D,
        template: &KernelTemplate,
        config: &BenchConfig,
        options: &SweepOptions,
        geometry: &LaunchGeometry,
    ) -> Result<Self>
    where
        D: ComputeDevice<Kernel = K>,
    {
        let mut variants = HashMap::new();
        for element_type in options.enabled_types() {
            for ratio in RatioPoint::descending(config.max_ratio) {
                let params =
                    KernelParams::new(config, element_type, ratio, geometry, options.addressing);
                let spec = KernelSpec::new(template, params);
                debug!("Compiling {}", spec.name());
                let kernel = device.compile(&spec)?;
                variants.insert(
                    VariantKey {
                        element_type,
                        ratio,
                    },
                    kernel,
                );
            }
        }
        Ok(Self { variants })
    }

    /// Look up a variant.
    pub fn get(&self, element_type: ElementType, ratio: RatioPoint) -> Option<&K> {
        self.variants.get(&VariantKey {
            element_type,
            ratio,
        })
    }

    /// Number of compiled variants.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Check if no variant was compiled.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Release every variant exactly once.
    pub fn release<D>(self, device: &D) -> Result<()>
    where
        D: ComputeDevice<Kernel = K>,
    {
        for (_, kernel) in self.variants {
            device.release_kernel(kernel)?;
        }
        Ok(())
    }
}

/// Peak figures over the measured rows of one element type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    /// Highest arithmetic throughput, 10^9 ops/s.
    pub giga_ops: f64,
    /// Ratio point of the highest throughput.
    pub giga_ops_ratio: RatioPoint,
    /// Highest bandwidth, 10^9 bytes/s.
    pub giga_bytes: f64,
    /// Ratio point of the highest bandwidth.
    pub giga_bytes_ratio: RatioPoint,
}

/// Result of a full sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    /// Geometry shared by every ratio point.
    pub geometry: LaunchGeometry,
    /// Work per launch.
    pub work: WorkPerLaunch,
    /// Discarded warmup duration.
    pub warmup_ms: f64,
    /// One row per ratio point, descending.
    pub rows: Vec<SweepRow>,
}

impl SweepReport {
    /// Peak throughput and bandwidth of an element type.
    ///
    /// Unmeasured entries are skipped; `None` if the type was never measured.
    pub fn peak(&self, element_type: ElementType) -> Option<Peak> {
        let mut peak: Option<Peak> = None;
        for row in &self.rows {
            let timing = row.get(element_type).timing;
            let Timing::Measured {
                giga_ops,
                giga_bytes,
                ..
            } = timing
            else {
                continue;
            };
            let p = peak.get_or_insert(Peak {
                giga_ops,
                giga_ops_ratio: row.ratio,
                giga_bytes,
                giga_bytes_ratio: row.ratio,
            });
            if giga_ops > p.giga_ops {
                p.giga_ops = giga_ops;
                p.giga_ops_ratio = row.ratio;
            }
            if giga_bytes > p.giga_bytes {
                p.giga_bytes = giga_bytes;
                p.giga_bytes_ratio = row.ratio;
            }
        }
        peak
    }
}

/// Drives one sweep on one device.
///
/// Owns the device buffer and the device queue for its whole lifetime.
pub struct SweepController<'d, D: ComputeDevice> {
    device: &'d D,
    config: BenchConfig,
    options: SweepOptions,
    elements: usize,
    geometry: LaunchGeometry,
    warmup_geometry: LaunchGeometry,
    state: SweepState,
}

impl<'d, D: ComputeDevice> SweepController<'d, D> {
    /// Create a controller for a buffer of `elements` 8-byte slots.
    pub fn new(
        device: &'d D,
        config: BenchConfig,
        options: SweepOptions,
        elements: usize,
    ) -> Result<Self> {
        config.validate()?;
        let geometry = LaunchGeometry::for_sweep(&config, elements)?;
        let warmup_geometry = LaunchGeometry::for_warmup(&config, elements)?;
        Ok(Self {
            device,
            config,
            options,
            elements,
            geometry,
            warmup_geometry,
            state: SweepState::Idle,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SweepState {
        self.state
    }

    /// Geometry used by every ratio point.
    pub fn geometry(&self) -> &LaunchGeometry {
        &self.geometry
    }

    /// Geometry of the warmup launch.
    pub fn warmup_geometry(&self) -> &LaunchGeometry {
        &self.warmup_geometry
    }

    fn transition(&mut self, expected: SweepState, next: SweepState) -> Result<()> {
        if self.state != expected {
            return Err(MixbenchError::InvalidState {
                expected: expected.to_string(),
                actual: self.state.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Run the sweep, emitting one row per ratio point and leaving the final
    /// buffer contents in `output`.
    pub fn run<E: ResultEmitter>(
        &mut self,
        template: &KernelTemplate,
        emitter: &mut E,
        output: &mut [f64],
    ) -> Result<SweepReport> {
        if self.state != SweepState::Idle {
            return Err(MixbenchError::InvalidState {
                expected: SweepState::Idle.to_string(),
                actual: self.state.to_string(),
            });
        }
        if output.len() < self.elements {
            return Err(MixbenchError::InvalidConfig(format!(
                "output holds {} elements, sweep needs {}",
                output.len(),
                self.elements
            )));
        }
        for element_type in ElementType::ALL {
            if !self.options.is_enabled(element_type) {
                warn!("{} variants disabled, reporting sentinel values", element_type);
            }
        }

        let device = self.device;

        // Idle: buffer setup and precompilation.
        let mut buffer = device.alloc_buffer(self.elements)?;
        device.zero_fill(&mut buffer)?;

        info!("Precompiling kernels");
        let warmup_params = KernelParams::new(
            &self.config,
            ElementType::Int,
            RatioPoint::new(0, self.config.max_ratio)?,
            &self.warmup_geometry,
            self.options.addressing,
        );
        let warmup_kernel = device.compile(&KernelSpec::new(template, warmup_params))?;
        let table = KernelTable::compile(
            device,
            template,
            &self.config,
            &self.options,
            &self.geometry,
        )?;
        info!("Compiled {} kernel variants", table.len() + 1);

        emitter.begin(&ReportHeader {
            device: device.name(),
            addressing: self.options.addressing,
            geometry: self.geometry,
        })?;

        let warmup_launch = KernelLaunch {
            geometry: &self.warmup_geometry,
            seed: ElementType::Int.seed(),
        };
        let warmup_ms = device.launch_timed(&warmup_kernel, &warmup_launch, &mut buffer)?;
        debug!("Warmup runtime {:.3} ms", warmup_ms);
        self.transition(SweepState::Idle, SweepState::WarmedUp)?;

        let work = WorkPerLaunch::new(&self.config, &self.geometry);
        let mut rows = Vec::with_capacity(self.config.max_ratio as usize + 1);
        let mut expected = SweepState::WarmedUp;
        for ratio in RatioPoint::descending(self.config.max_ratio) {
            self.transition(expected, SweepState::Measuring(ratio))?;
            expected = SweepState::Measuring(ratio);

            let mut row = SweepRow::unmeasured(ratio);
            for element_type in ElementType::REPORT_ORDER {
                let Some(kernel) = table.get(element_type, ratio) else {
                    continue;
                };
                let launch = KernelLaunch {
                    geometry: &self.geometry,
                    seed: element_type.seed(),
                };
                let elapsed_ms = device.launch_timed(kernel, &launch, &mut buffer)?;
                row.set(element_type, work.derive(ratio, element_type, elapsed_ms)?);
            }
            emitter.row(&row)?;
            rows.push(row);
        }
        emitter.finish()?;

        device.read_back(&buffer, &mut output[..self.elements])?;
        self.transition(expected, SweepState::Drained)?;

        device.release_kernel(warmup_kernel)?;
        table.release(device)?;
        device.release_buffer(buffer)?;
        self.transition(SweepState::Drained, SweepState::Released)?;
        info!("Sweep complete: {} ratio points", rows.len());

        Ok(SweepReport {
            geometry: self.geometry,
            work,
            warmup_ms,
            rows,
        })
    }
}

/// Run the full sweep on `device`.
///
/// `output` receives the final buffer contents and must hold at least
/// `elements` values.
pub fn run_mix_benchmark<D: ComputeDevice, E: ResultEmitter>(
    device: &D,
    template: &KernelTemplate,
    output: &mut [f64],
    elements: usize,
    config: BenchConfig,
    options: SweepOptions,
    emitter: &mut E,
) -> Result<SweepReport> {
    let mut controller = SweepController::new(device, config, options, elements)?;
    controller.run(template, emitter, output)
}
