//! Scalar types, ratio points and addressing modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MixbenchError, Result};

/// Scalar type used inside the kernel body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// 32-bit signed integer.
    Int,
    /// Single-precision float.
    Float,
    /// Double-precision float.
    Double,
}

impl ElementType {
    /// All element types.
    pub const ALL: [ElementType; 3] = [ElementType::Int, ElementType::Float, ElementType::Double];

    /// Column order of the report: single precision, double precision, integer.
    pub const REPORT_ORDER: [ElementType; 3] =
        [ElementType::Float, ElementType::Double, ElementType::Int];

    /// Type name substituted into the kernel template.
    pub const fn type_name(self) -> &'static str {
        match self {
            ElementType::Int => "int",
            ElementType::Float => "float",
            ElementType::Double => "double",
        }
    }

    /// Size in bytes, used as the bandwidth multiplier.
    pub const fn size_bytes(self) -> usize {
        match self {
            ElementType::Int => 4,
            ElementType::Float => 4,
            ElementType::Double => 8,
        }
    }

    /// Seed argument bound to every launch.
    pub const fn seed(self) -> Seed {
        match self {
            ElementType::Int => Seed::Int(1),
            ElementType::Float => Seed::Float(1.0),
            ElementType::Double => Seed::Double(1.0),
        }
    }

    /// Label of the throughput column (`GFLOPS` or `GIOPS`).
    pub const fn ops_label(self) -> &'static str {
        match self {
            ElementType::Int => "GIOPS",
            ElementType::Float | ElementType::Double => "GFLOPS",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ElementType {
    type Err = MixbenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "i32" => Ok(ElementType::Int),
            "float" | "single" | "sp" | "f32" => Ok(ElementType::Float),
            "double" | "dp" | "f64" => Ok(ElementType::Double),
            other => Err(MixbenchError::InvalidConfig(format!(
                "unknown element type '{}'",
                other
            ))),
        }
    }
}

/// Scalar kernel argument matching an [`ElementType`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Seed {
    /// Integer seed.
    Int(i32),
    /// Single-precision seed.
    Float(f32),
    /// Double-precision seed.
    Double(f64),
}

/// Number of memory slots out of `max_ratio` unrolled slots.
///
/// Constructed only through [`RatioPoint::new`], which enforces
/// `0 <= ratio <= max_ratio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RatioPoint {
    memory_slots: u32,
    max_ratio: u32,
}

impl RatioPoint {
    /// Create a ratio point.
    pub fn new(memory_slots: u32, max_ratio: u32) -> Result<Self> {
        if memory_slots > max_ratio {
            return Err(MixbenchError::InvalidConfig(format!(
                "memory ratio {} exceeds maximum {}",
                memory_slots, max_ratio
            )));
        }
        Ok(Self {
            memory_slots,
            max_ratio,
        })
    }

    /// All ratio points from `max_ratio` down to zero.
    pub fn descending(max_ratio: u32) -> impl Iterator<Item = RatioPoint> {
        (0..=max_ratio).rev().map(move |memory_slots| RatioPoint {
            memory_slots,
            max_ratio,
        })
    }

    /// Memory slots (the ratio value).
    pub const fn memory_slots(&self) -> u32 {
        self.memory_slots
    }

    /// Arithmetic slots, `max_ratio - ratio`.
    pub const fn compute_slots(&self) -> u32 {
        self.max_ratio - self.memory_slots
    }

    /// Upper bound of the ratio.
    pub const fn max_ratio(&self) -> u32 {
        self.max_ratio
    }

    /// Fraction of slots that are memory operations.
    pub fn memory_fraction(&self) -> f64 {
        self.memory_slots as f64 / self.max_ratio as f64
    }

    /// Fraction of slots that are arithmetic operations.
    pub fn compute_fraction(&self) -> f64 {
        1.0 - self.memory_fraction()
    }
}

impl fmt::Display for RatioPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.compute_slots(), self.memory_slots)
    }
}

/// Global-memory traversal pattern baked into a kernel build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressingMode {
    /// Each block walks its own contiguous tile, threads stride by block size.
    #[default]
    BlockStrided,
    /// Threads stride across the whole grid.
    GridStrided,
}

impl AddressingMode {
    /// Short tag used in variant names.
    pub const fn tag(self) -> &'static str {
        match self {
            AddressingMode::BlockStrided => "block",
            AddressingMode::GridStrided => "grid",
        }
    }

    /// Description printed in the report header.
    pub const fn description(self) -> &'static str {
        match self {
            AddressingMode::BlockStrided => "compute with global memory (block strided)",
            AddressingMode::GridStrided => "compute with global memory (grid strided)",
        }
    }
}

impl FromStr for AddressingMode {
    type Err = MixbenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" | "block-strided" => Ok(AddressingMode::BlockStrided),
            "grid" | "grid-strided" => Ok(AddressingMode::GridStrided),
            other => Err(MixbenchError::InvalidConfig(format!(
                "unknown addressing mode '{}'",
                other
            ))),
        }
    }
}
