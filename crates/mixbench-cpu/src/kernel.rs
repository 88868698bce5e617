//! Host execution of the benchmark kernel.
//!
//! Mirrors `kernels/mix_kernels.cu` thread by thread: four-register
//! multiply-add rotation in compute slots, store/load alternation in memory
//! slots, and the index slip-and-reset at the end of every unrolled body.

use bytemuck::Pod;

use mixbench_core::template::KernelParams;
use mixbench_core::types::{AddressingMode, Seed};

/// Registers rotated through by memory slots.
pub const REGISTERS: usize = 4;

/// Scalar arithmetic of one element type.
pub trait Scalar: Pod + PartialEq {
    /// `self * self + addend`, wrapping for integers.
    fn mad(self, addend: Self) -> Self;

    /// `self + other`, wrapping for integers.
    fn add(self, other: Self) -> Self;

    /// Convert a small integer constant or thread index.
    fn from_index(value: i64) -> Self;

    /// Extract the seed argument.
    fn from_seed(seed: Seed) -> Option<Self>;
}

impl Scalar for i32 {
    fn mad(self, addend: Self) -> Self {
        self.wrapping_mul(self).wrapping_add(addend)
    }

    fn add(self, other: Self) -> Self {
        self.wrapping_add(other)
    }

    fn from_index(value: i64) -> Self {
        value as i32
    }

    fn from_seed(seed: Seed) -> Option<Self> {
        match seed {
            Seed::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl Scalar for f32 {
    fn mad(self, addend: Self) -> Self {
        self * self + addend
    }

    fn add(self, other: Self) -> Self {
        self + other
    }

    fn from_index(value: i64) -> Self {
        value as f32
    }

    fn from_seed(seed: Seed) -> Option<Self> {
        match seed {
            Seed::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl Scalar for f64 {
    fn mad(self, addend: Self) -> Self {
        self * self + addend
    }

    fn add(self, other: Self) -> Self {
        self + other
    }

    fn from_index(value: i64) -> Self {
        value as f64
    }

    fn from_seed(seed: Seed) -> Option<Self> {
        match seed {
            Seed::Double(v) => Some(v),
            _ => None,
        }
    }
}

/// Compile-time constants of one variant, resolved to host integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelShape {
    /// Threads per block.
    pub block_size: usize,
    /// Baked total thread count.
    pub grid_size: usize,
    /// Memory slots per unrolled body.
    pub memory_ratio: usize,
    /// Unrolled body length.
    pub unroll_iterations: usize,
    /// Loop iterations per thread.
    pub comp_iterations: usize,
    /// Block- or grid-strided traversal.
    pub addressing: AddressingMode,
}

impl KernelShape {
    /// Resolve the constants of a variant.
    pub fn from_params(params: &KernelParams) -> Self {
        Self {
            block_size: params.block_size as usize,
            grid_size: params.grid_size as usize,
            memory_ratio: params.memory_ratio() as usize,
            unroll_iterations: params.unroll_iterations as usize,
            comp_iterations: params.comp_iterations as usize,
            addressing: params.addressing,
        }
    }

    /// Memory slots per body that advance the read index.
    pub fn unrolled_memory_accesses(&self) -> usize {
        self.unroll_iterations / 2
    }

    /// Offset of the store region.
    pub fn half_array_size(&self) -> usize {
        self.grid_size * self.unrolled_memory_accesses()
    }

    /// Scalars the kernel may touch.
    pub fn required_len(&self) -> usize {
        2 * self.half_array_size()
    }
}

/// Execute every thread of `blocks` blocks in order.
///
/// `data` must hold at least [`KernelShape::required_len`] scalars.
pub fn run_grid<T: Scalar>(shape: &KernelShape, blocks: usize, seed: T, data: &mut [T]) {
    for block_idx in 0..blocks {
        for thread_idx in 0..shape.block_size {
            run_thread(shape, block_idx, thread_idx, seed, data);
        }
    }
}

fn run_thread<T: Scalar>(
    shape: &KernelShape,
    block_idx: usize,
    thread_idx: usize,
    seed: T,
    data: &mut [T],
) {
    let uma = shape.unrolled_memory_accesses();
    let (stride, base) = match shape.addressing {
        AddressingMode::BlockStrided => (
            shape.block_size,
            block_idx * shape.block_size * uma + thread_idx,
        ),
        AddressingMode::GridStrided => (shape.grid_size, block_idx * shape.block_size + thread_idx),
    };
    let half = shape.half_array_size();
    let ratio = shape.memory_ratio;
    let writes = (ratio + 1) / 2;
    let offset_slips = 1 + uma - writes;
    let bound = base + offset_slips * stride;
    let initial_index_range = if ratio > 0 { uma % writes } else { 1 };
    let mut initial_index_factor = 0;
    let mut index = base;

    let global_id = (block_idx * shape.block_size + thread_idx) as i64;
    let r0 = seed.add(T::from_index(global_id));
    let mut regs: [T; REGISTERS] = [
        r0,
        r0.add(T::from_index(2)),
        r0.add(T::from_index(3)),
        r0.add(T::from_index(5)),
    ];

    for _ in (0..shape.comp_iterations).step_by(shape.unroll_iterations) {
        for _ in 0..shape.unroll_iterations - ratio {
            regs[0] = regs[0].mad(regs[1]);
            regs[1] = regs[1].mad(regs[2]);
            regs[2] = regs[2].mad(regs[3]);
            regs[3] = regs[3].mad(regs[0]);
        }

        let mut do_write = true;
        let mut reg_idx = 0;
        for _ in 0..ratio {
            if do_write {
                data[index + half] = regs[reg_idx];
            } else {
                regs[reg_idx] = data[index];
                reg_idx = (reg_idx + 1) % REGISTERS;
                index += stride;
            }
            do_write = !do_write;
        }

        if index >= bound {
            initial_index_factor += 1;
            if initial_index_factor > initial_index_range {
                initial_index_factor = 0;
            }
            index = base + initial_index_factor * stride;
        }
    }

    let marker = T::from_index(-1);
    if regs.iter().all(|r| *r == marker) {
        data[0] = regs[0].add(regs[1]).add(regs[2]).add(regs[3]);
    }
}
