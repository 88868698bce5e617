//! Error types for the mixbench CLI.

use thiserror::Error;

/// CLI result type alias.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type.
#[derive(Error, Debug)]
pub enum CliError {
    /// Benchmark failure.
    #[error(transparent)]
    Benchmark(#[from] mixbench_core::MixbenchError),

    /// Report output error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Feature not available.
    #[error("Feature not available: {0}. Enable with --features {1}")]
    FeatureNotAvailable(String, String),

    /// No device matches the request.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
}
