//! mixbench - GPU compute/memory trade-off micro-benchmark.
//!
//! Sweeps the share of memory operations in a fixed-work kernel from
//! all-memory down to all-compute and reports time, throughput and bandwidth
//! for every ratio point.
//!
//! # Examples
//!
//! ```bash
//! # Reference sweep on the first CUDA device
//! mixbench --backend cuda
//!
//! # All element types, grid-strided, as JSON lines
//! mixbench --backend cuda --types float,double,int --addressing grid --format json
//!
//! # Host reference device with a smaller buffer
//! mixbench --backend cpu --elements 262144
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use mixbench_core::{AddressingMode, ElementType};

mod bench;
mod error;

use bench::{Backend, BenchArgs, Format};
use error::CliError;

/// Default buffer length in 8-byte elements.
const DEFAULT_ELEMENTS: usize = 8 * 1024 * 1024;

/// mixbench - compute/memory trade-off micro-benchmark
#[derive(Parser, Debug)]
#[command(name = "mixbench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Execution backend
    #[arg(short, long, value_enum, default_value_t = Backend::preferred())]
    backend: Backend,

    /// Device ordinal
    #[arg(short, long, default_value_t = 0)]
    device: usize,

    /// Buffer length in 8-byte elements
    #[arg(short, long, default_value_t = DEFAULT_ELEMENTS)]
    elements: usize,

    /// Kernel template file (default: built-in template)
    #[arg(short, long)]
    kernel_file: Option<PathBuf>,

    /// Global-memory addressing mode (block, grid)
    #[arg(short, long, default_value = "block")]
    addressing: AddressingMode,

    /// Element types to measure (comma-separated: float,double,int)
    #[arg(short, long, value_delimiter = ',', default_value = "float")]
    types: Vec<ElementType>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "table")]
    format: Format,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and the report
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn bench_args(&self) -> BenchArgs {
        BenchArgs {
            backend: self.backend,
            device: self.device,
            elements: self.elements,
            kernel_file: self.kernel_file.clone(),
            addressing: self.addressing,
            types: self.types.clone(),
            format: self.format,
            quiet: self.quiet,
        }
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match bench::execute(&cli.bench_args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Benchmark(e)) => {
            eprint!("{} ", "Error:".red().bold());
            e.report();
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
