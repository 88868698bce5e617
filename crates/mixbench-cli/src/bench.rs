//! The benchmark command.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use colored::Colorize;
use tracing::info;

use mixbench_core::prelude::*;
use mixbench_cpu::HostDevice;

use crate::error::{CliError, CliResult};

/// Template shipped with the binary, used when no kernel file is given.
pub const BUILTIN_TEMPLATE: &str = include_str!("../../../kernels/mix_kernels.cu");

/// Execution backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Host reference device.
    Cpu,
    /// CUDA device (requires the `cuda` feature).
    Cuda,
}

impl Backend {
    /// CUDA when compiled in, otherwise the host device.
    pub fn preferred() -> Self {
        if cfg!(feature = "cuda") {
            Backend::Cuda
        } else {
            Backend::Cpu
        }
    }
}

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Comma-separated text table.
    Table,
    /// One JSON object per line.
    Json,
}

/// Resolved benchmark arguments.
#[derive(Debug, Clone)]
pub struct BenchArgs {
    pub backend: Backend,
    pub device: usize,
    pub elements: usize,
    pub kernel_file: Option<PathBuf>,
    pub addressing: AddressingMode,
    pub types: Vec<ElementType>,
    pub format: Format,
    pub quiet: bool,
}

impl BenchArgs {
    fn options(&self) -> SweepOptions {
        SweepOptions {
            addressing: self.addressing,
            element_types: self.types.clone(),
        }
    }
}

/// Load the kernel template from `path`, or the built-in one.
pub fn load_template(path: Option<&Path>) -> CliResult<KernelTemplate> {
    let template = match path {
        Some(path) => {
            info!("Loading kernel file {}", path.display());
            KernelTemplate::from_file(path)?
        }
        None => KernelTemplate::from_source("mix_kernels.cu (built-in)", BUILTIN_TEMPLATE)?,
    };
    Ok(template)
}

/// Run the sweep on the selected backend and write the report to stdout.
pub fn execute(args: &BenchArgs) -> CliResult<()> {
    let template = load_template(args.kernel_file.as_deref())?;

    match args.backend {
        Backend::Cpu => {
            if args.device != 0 {
                return Err(CliError::DeviceNotFound(format!(
                    "host device {} (only 0 exists)",
                    args.device
                )));
            }
            let device = HostDevice::new();
            sweep(&device, &template, args)
        }
        Backend::Cuda => run_cuda(&template, args),
    }
}

#[cfg(feature = "cuda")]
fn run_cuda(template: &KernelTemplate, args: &BenchArgs) -> CliResult<()> {
    let count = mixbench_cuda::cuda_device_count();
    if args.device >= count {
        return Err(CliError::DeviceNotFound(format!(
            "CUDA device {} ({} available)",
            args.device, count
        )));
    }
    let device = mixbench_cuda::CudaDevice::new(args.device)?;
    sweep(&device, template, args)
}

#[cfg(not(feature = "cuda"))]
fn run_cuda(_template: &KernelTemplate, _args: &BenchArgs) -> CliResult<()> {
    Err(CliError::FeatureNotAvailable(
        "CUDA backend".to_string(),
        "cuda".to_string(),
    ))
}

fn sweep<D: ComputeDevice>(
    device: &D,
    template: &KernelTemplate,
    args: &BenchArgs,
) -> CliResult<()> {
    let options = args.options();
    if !args.quiet {
        eprintln!("{} {}", "Device:".bold(), device.name().bright_white());
        eprintln!(
            "{} {} elements ({} MB)",
            "Buffer:".bold(),
            args.elements,
            args.elements * std::mem::size_of::<f64>() / (1024 * 1024)
        );
        eprintln!("{} {}", "Template:".bold(), template.origin());
    }

    let mut output = vec![0.0f64; args.elements];
    let stdout = io::stdout();
    let report = match args.format {
        Format::Table => {
            let mut emitter = TableEmitter::new(stdout.lock());
            run_mix_benchmark(
                device,
                template,
                &mut output,
                args.elements,
                BenchConfig::default(),
                options.clone(),
                &mut emitter,
            )?
        }
        Format::Json => {
            let mut emitter = JsonLinesEmitter::new(stdout.lock());
            run_mix_benchmark(
                device,
                template,
                &mut output,
                args.elements,
                BenchConfig::default(),
                options.clone(),
                &mut emitter,
            )?
        }
    };

    if !args.quiet {
        print_summary(&report, &options)?;
    }
    Ok(())
}

fn print_summary(report: &SweepReport, options: &SweepOptions) -> CliResult<()> {
    let mut err = io::stderr().lock();
    writeln!(err)?;
    writeln!(err, "{}", "Summary".bright_cyan().bold())?;
    writeln!(err, "  Warmup: {:.3} ms (discarded)", report.warmup_ms)?;
    for element_type in options.enabled_types() {
        if let Some(peak) = report.peak(element_type) {
            writeln!(
                err,
                "  {:<6} peak {} {} at {}, {} GB/sec at {}",
                element_type.to_string(),
                format!("{:.2}", peak.giga_ops).bright_white(),
                element_type.ops_label(),
                peak.giga_ops_ratio,
                format!("{:.2}", peak.giga_bytes).bright_white(),
                peak.giga_bytes_ratio
            )?;
        }
    }
    Ok(())
}
