//! Launch geometry.

use serde::Serialize;

use crate::config::BenchConfig;
use crate::error::{MixbenchError, Result};

/// Block and grid dimensions of a launch.
///
/// `grid_size` counts work-items (threads), the unit used by the throughput
/// formulas. The sweep geometry depends only on the buffer length and the
/// unrolled memory-access count, never on the ratio point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LaunchGeometry {
    /// Threads per block.
    pub block_size: u32,
    /// Total threads.
    pub grid_size: u64,
}

impl LaunchGeometry {
    /// Geometry shared by every ratio point of a sweep over `elements` slots.
    pub fn for_sweep(config: &BenchConfig, elements: usize) -> Result<Self> {
        let per_thread = config.unrolled_memory_accesses() as u64 * 2;
        let grid_size = elements as u64 / per_thread;
        let block = config.block_size as u64;

        if grid_size == 0 || grid_size % block != 0 {
            return Err(MixbenchError::InvalidConfig(format!(
                "{} elements give a grid of {} threads, which is not a non-zero multiple of block size {}",
                elements, grid_size, block
            )));
        }
        if grid_size / block > u32::MAX as u64 {
            return Err(MixbenchError::InvalidConfig(format!(
                "{} elements need more than {} blocks",
                elements,
                u32::MAX
            )));
        }

        Ok(Self {
            block_size: config.block_size,
            grid_size,
        })
    }

    /// Reduced geometry of the warmup launch.
    ///
    /// Rounded down to whole blocks, never below one block.
    pub fn for_warmup(config: &BenchConfig, elements: usize) -> Result<Self> {
        let sweep = Self::for_sweep(config, elements)?;
        let block = config.block_size as u64;
        let reduced = sweep.grid_size / config.warmup_grid_divisor;
        let grid_size = (reduced / block).max(1) * block;
        Ok(Self {
            block_size: config.block_size,
            grid_size,
        })
    }

    /// Number of blocks.
    pub fn blocks(&self) -> u32 {
        (self.grid_size / self.block_size as u64) as u32
    }
}
