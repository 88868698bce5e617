//! Throughput derivation.
//!
//! Formulas (per launch, `grid_size` work-items):
//!
//! - arithmetic ops = `2 * COMP_ITERATIONS * REGBLOCK_SIZE * grid_size`
//! - memory ops = `COMP_ITERATIONS * grid_size`
//! - G ops/s = `compute_fraction * arithmetic_ops / elapsed_ms * 1e-6`
//! - GB/s = `memory_fraction * memory_ops * size_of(T) / elapsed_ms * 1e-6`

use serde::{Serialize, Serializer};

use crate::config::BenchConfig;
use crate::error::{MixbenchError, Result};
use crate::geometry::LaunchGeometry;
use crate::types::{ElementType, RatioPoint};

/// Value reported for every field of an unmeasured variant.
pub const SENTINEL: f64 = -1.0;

/// Work issued by one launch, independent of the ratio point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkPerLaunch {
    /// Arithmetic operations (a fused multiply-add counts as two).
    pub arithmetic_ops: u64,
    /// Logical memory operations.
    pub memory_ops: u64,
}

impl WorkPerLaunch {
    /// Work for a sweep launch under `config` and `geometry`.
    pub fn new(config: &BenchConfig, geometry: &LaunchGeometry) -> Self {
        let iterations = config.comp_iterations as u64;
        Self {
            arithmetic_ops: 2 * iterations * config.regblock_size as u64 * geometry.grid_size,
            memory_ops: iterations * geometry.grid_size,
        }
    }

    /// Derive throughput for a measured launch.
    pub fn derive(
        &self,
        ratio: RatioPoint,
        element_type: ElementType,
        elapsed_ms: f64,
    ) -> Result<Timing> {
        if !(elapsed_ms.is_finite() && elapsed_ms > 0.0) {
            return Err(MixbenchError::launch(
                "elapsed time",
                format!("device reported {} ms for ratio {}", elapsed_ms, ratio),
            ));
        }
        let ops_per_sec =
            ratio.compute_fraction() * self.arithmetic_ops as f64 / elapsed_ms * 1e-6;
        let bytes_per_sec = ratio.memory_fraction()
            * self.memory_ops as f64
            * element_type.size_bytes() as f64
            / elapsed_ms
            * 1e-6;
        Ok(Timing::Measured {
            elapsed_ms,
            giga_ops: ops_per_sec,
            giga_bytes: bytes_per_sec,
        })
    }
}

/// Outcome of one (element type, ratio) launch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timing {
    /// Launch ran and was timed.
    Measured {
        /// Device-measured duration.
        elapsed_ms: f64,
        /// Arithmetic throughput, 10^9 ops/s.
        giga_ops: f64,
        /// Memory bandwidth, 10^9 bytes/s.
        giga_bytes: f64,
    },
    /// Variant was never built for this element type.
    NotMeasured,
}

impl Timing {
    /// Check whether this is a real measurement.
    pub fn is_measured(&self) -> bool {
        matches!(self, Timing::Measured { .. })
    }

    /// Elapsed time, or [`SENTINEL`].
    pub fn elapsed_ms(&self) -> f64 {
        match self {
            Timing::Measured { elapsed_ms, .. } => *elapsed_ms,
            Timing::NotMeasured => SENTINEL,
        }
    }

    /// Throughput, or [`SENTINEL`].
    pub fn giga_ops(&self) -> f64 {
        match self {
            Timing::Measured { giga_ops, .. } => *giga_ops,
            Timing::NotMeasured => SENTINEL,
        }
    }

    /// Bandwidth, or [`SENTINEL`].
    pub fn giga_bytes(&self) -> f64 {
        match self {
            Timing::Measured { giga_bytes, .. } => *giga_bytes,
            Timing::NotMeasured => SENTINEL,
        }
    }
}

impl Serialize for Timing {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Timing", 3)?;
        state.serialize_field("time_ms", &self.elapsed_ms())?;
        state.serialize_field("gops", &self.giga_ops())?;
        state.serialize_field("gbps", &self.giga_bytes())?;
        state.end()
    }
}

/// Measurement of one element type at one ratio point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    /// Element type.
    pub element_type: ElementType,
    /// Timing outcome.
    #[serde(flatten)]
    pub timing: Timing,
}

/// One report row: every element type at one ratio point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    /// Ratio point.
    pub ratio: RatioPoint,
    /// Measurements in [`ElementType::REPORT_ORDER`].
    pub measurements: [Measurement; 3],
}

impl SweepRow {
    /// Row with every element type unmeasured.
    pub fn unmeasured(ratio: RatioPoint) -> Self {
        Self {
            ratio,
            measurements: ElementType::REPORT_ORDER.map(|element_type| Measurement {
                element_type,
                timing: Timing::NotMeasured,
            }),
        }
    }

    /// Measurement for an element type.
    pub fn get(&self, element_type: ElementType) -> &Measurement {
        let idx = report_index(element_type);
        &self.measurements[idx]
    }

    /// Record a timing for an element type.
    pub fn set(&mut self, element_type: ElementType, timing: Timing) {
        let idx = report_index(element_type);
        self.measurements[idx].timing = timing;
    }
}

fn report_index(element_type: ElementType) -> usize {
    match element_type {
        ElementType::Float => 0,
        ElementType::Double => 1,
        ElementType::Int => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_work(elements: usize) -> WorkPerLaunch {
        let config = BenchConfig::default();
        let geometry = LaunchGeometry::for_sweep(&config, elements).unwrap();
        WorkPerLaunch::new(&config, &geometry)
    }

    #[test]
    fn test_work_per_launch() {
        let work = reference_work(8 * 1024 * 1024);
        assert_eq!(work.arithmetic_ops, 2 * 8192 * 4 * 262_144);
        assert_eq!(work.memory_ops, 8192 * 262_144);
    }

    #[test]
    fn test_all_memory_point() {
        let work = reference_work(8 * 1024 * 1024);
        let ratio = RatioPoint::new(32, 32).unwrap();
        let timing = work.derive(ratio, ElementType::Float, 10.0).unwrap();

        assert_eq!(timing.giga_ops(), 0.0);
        let expected = work.memory_ops as f64 * 4.0 / 10.0 * 1e-6;
        assert!((timing.giga_bytes() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_all_compute_point() {
        let work = reference_work(8 * 1024 * 1024);
        let ratio = RatioPoint::new(0, 32).unwrap();
        let timing = work.derive(ratio, ElementType::Double, 20.0).unwrap();

        assert_eq!(timing.giga_bytes(), 0.0);
        let expected = work.arithmetic_ops as f64 / 20.0 * 1e-6;
        assert!((timing.giga_ops() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_bandwidth_uses_element_size() {
        let work = reference_work(8 * 1024 * 1024);
        let ratio = RatioPoint::new(16, 32).unwrap();
        let sp = work.derive(ratio, ElementType::Float, 5.0).unwrap();
        let dp = work.derive(ratio, ElementType::Double, 5.0).unwrap();
        assert!((dp.giga_bytes() - 2.0 * sp.giga_bytes()).abs() < 1e-9);
        assert_eq!(dp.giga_ops(), sp.giga_ops());
    }

    #[test]
    fn test_rejects_non_positive_elapsed() {
        let work = reference_work(8 * 1024 * 1024);
        let ratio = RatioPoint::new(3, 32).unwrap();
        assert!(work.derive(ratio, ElementType::Float, 0.0).is_err());
        assert!(work.derive(ratio, ElementType::Float, SENTINEL).is_err());
        assert!(work.derive(ratio, ElementType::Float, f64::NAN).is_err());
    }

    #[test]
    fn test_sentinel_propagation() {
        let row = SweepRow::unmeasured(RatioPoint::new(7, 32).unwrap());
        for m in &row.measurements {
            assert!(!m.timing.is_measured());
            assert_eq!(m.timing.elapsed_ms(), SENTINEL);
            assert_eq!(m.timing.giga_ops(), SENTINEL);
            assert_eq!(m.timing.giga_bytes(), SENTINEL);
        }
    }

    #[test]
    fn test_row_set_get() {
        let mut row = SweepRow::unmeasured(RatioPoint::new(1, 32).unwrap());
        let timing = Timing::Measured {
            elapsed_ms: 1.5,
            giga_ops: 2.0,
            giga_bytes: 3.0,
        };
        row.set(ElementType::Int, timing);
        assert_eq!(row.get(ElementType::Int).timing, timing);
        assert!(!row.get(ElementType::Float).timing.is_measured());
        assert_eq!(row.measurements[2].element_type, ElementType::Int);
    }

    #[test]
    fn test_serialize_sentinel() {
        let m = Measurement {
            element_type: ElementType::Double,
            timing: Timing::NotMeasured,
        };
        let json = serde_json::to_value(m).unwrap();
        assert_eq!(json["element_type"], "double");
        assert_eq!(json["time_ms"], -1.0);
        assert_eq!(json["gbps"], -1.0);
    }
}
