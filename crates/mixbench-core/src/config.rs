//! Benchmark configuration.
//!
//! The tunables are build-time constants in the reference configuration.
//! They are carried in [`BenchConfig`] so that the sweep shape can be
//! exercised with small synthetic values.

use serde::Serialize;

use crate::error::{MixbenchError, Result};
use crate::types::{AddressingMode, ElementType};

/// Loop iterations per thread.
pub const COMP_ITERATIONS: u32 = 8192;
/// Slots in one unrolled loop body.
pub const UNROLL_ITERATIONS: u32 = 32;
/// Registers rotated through by memory slots.
pub const REGBLOCK_SIZE: u32 = 4;
/// Threads per block.
pub const BLOCK_SIZE: u32 = 256;
/// Largest ratio point.
pub const MAX_RATIO: u32 = 32;
/// Grid shrink factor of the warmup launch relative to the sweep grid.
pub const WARMUP_GRID_DIVISOR: u64 = 16;

/// Benchmark tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BenchConfig {
    /// Loop iterations per thread.
    pub comp_iterations: u32,
    /// Slots in one unrolled loop body.
    pub unroll_iterations: u32,
    /// Registers rotated through by memory slots.
    pub regblock_size: u32,
    /// Threads per block.
    pub block_size: u32,
    /// Largest ratio point.
    pub max_ratio: u32,
    /// Warmup grid shrink factor.
    pub warmup_grid_divisor: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            comp_iterations: COMP_ITERATIONS,
            unroll_iterations: UNROLL_ITERATIONS,
            regblock_size: REGBLOCK_SIZE,
            block_size: BLOCK_SIZE,
            max_ratio: MAX_RATIO,
            warmup_grid_divisor: WARMUP_GRID_DIVISOR,
        }
    }
}

impl BenchConfig {
    /// Memory slots per unrolled body that advance the read index.
    pub const fn unrolled_memory_accesses(&self) -> u32 {
        self.unroll_iterations / 2
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let nonzero = [
            ("comp_iterations", self.comp_iterations as u64),
            ("unroll_iterations", self.unroll_iterations as u64),
            ("block_size", self.block_size as u64),
            ("max_ratio", self.max_ratio as u64),
            ("warmup_grid_divisor", self.warmup_grid_divisor),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(MixbenchError::InvalidConfig(format!(
                    "{} must be non-zero",
                    name
                )));
            }
        }
        if self.unroll_iterations % 2 != 0 {
            return Err(MixbenchError::InvalidConfig(format!(
                "unroll_iterations must be even, got {}",
                self.unroll_iterations
            )));
        }
        if self.comp_iterations % self.unroll_iterations != 0 {
            return Err(MixbenchError::InvalidConfig(format!(
                "comp_iterations ({}) must be a multiple of unroll_iterations ({})",
                self.comp_iterations, self.unroll_iterations
            )));
        }
        if self.max_ratio != self.unroll_iterations {
            return Err(MixbenchError::InvalidConfig(format!(
                "max_ratio ({}) must equal unroll_iterations ({})",
                self.max_ratio, self.unroll_iterations
            )));
        }
        // The kernel body rotates over r0..r3.
        if self.regblock_size != 4 {
            return Err(MixbenchError::InvalidConfig(format!(
                "regblock_size must be 4, got {}",
                self.regblock_size
            )));
        }
        Ok(())
    }
}

/// Builder for [`BenchConfig`].
#[derive(Debug, Default)]
pub struct BenchConfigBuilder {
    config: BenchConfig,
}

impl BenchConfigBuilder {
    /// Creates a builder with the reference configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets loop iterations per thread.
    #[must_use]
    pub fn with_comp_iterations(mut self, iterations: u32) -> Self {
        self.config.comp_iterations = iterations;
        self
    }

    /// Sets the unrolled body length; the maximum ratio follows it.
    #[must_use]
    pub fn with_unroll_iterations(mut self, iterations: u32) -> Self {
        self.config.unroll_iterations = iterations;
        self.config.max_ratio = iterations;
        self
    }

    /// Sets threads per block.
    #[must_use]
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.config.block_size = block_size;
        self
    }

    /// Sets the warmup grid shrink factor.
    #[must_use]
    pub fn with_warmup_grid_divisor(mut self, divisor: u64) -> Self {
        self.config.warmup_grid_divisor = divisor;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<BenchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Per-run sweep selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepOptions {
    /// Addressing mode baked into every variant.
    pub addressing: AddressingMode,
    /// Element types to compile and measure.
    pub element_types: Vec<ElementType>,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            addressing: AddressingMode::BlockStrided,
            element_types: vec![ElementType::Float],
        }
    }
}

impl SweepOptions {
    /// Options measuring every element type.
    pub fn all_types(addressing: AddressingMode) -> Self {
        Self {
            addressing,
            element_types: ElementType::ALL.to_vec(),
        }
    }

    /// Check if an element type is measured.
    pub fn is_enabled(&self, element_type: ElementType) -> bool {
        self.element_types.contains(&element_type)
    }

    /// Enabled element types, deduplicated, in declaration order.
    pub fn enabled_types(&self) -> Vec<ElementType> {
        ElementType::ALL
            .into_iter()
            .filter(|t| self.is_enabled(*t))
            .collect()
    }
}
