//! Error types for mixbench.
//!
//! Every failure in the benchmark core is fatal. Device call sites convert
//! their native status into a [`MixbenchError`] through [`DeviceResultExt`],
//! the result is propagated with `?`, and the host application terminates
//! after printing [`MixbenchError::report`].

use std::fmt::Display;
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`MixbenchError`].
pub type Result<T> = std::result::Result<T, MixbenchError>;

/// Delimiter printed around kernel compilation logs.
const LOG_HEADER: &str =
    "------------------------------------ Kernel compilation log ----------------------------------";
const LOG_FOOTER: &str =
    "----------------------------------------------------------------------------------------------";

/// Comprehensive error type for mixbench operations.
#[derive(Error, Debug)]
pub enum MixbenchError {
    /// Context, queue or buffer creation failed.
    #[error("Resource acquisition failed in {op}: {status}")]
    ResourceAcquisition {
        /// Failing device operation.
        op: String,
        /// Status reported by the device API.
        status: String,
    },

    /// A kernel variant was rejected by the device toolchain.
    #[error("Kernel compilation failed for {variant}")]
    Compile {
        /// Variant name (element type, ratio, addressing mode).
        variant: String,
        /// Full toolchain diagnostic log.
        log: String,
    },

    /// Enqueue, event wait or transfer failed.
    #[error("Launch failed in {op}: {status}")]
    Launch {
        /// Failing device operation.
        op: String,
        /// Status reported by the device API.
        status: String,
    },

    /// The kernel template is malformed.
    #[error("Invalid kernel template: {0}")]
    Template(String),

    /// The kernel template could not be read.
    #[error("Cannot read kernel template {path}: {source}")]
    TemplateIo {
        /// Template path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Invalid benchmark configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Sweep state machine violated.
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state.
        expected: String,
        /// Actual state.
        actual: String,
    },

    /// Report output error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl MixbenchError {
    /// Create a resource acquisition error.
    pub fn resource(op: impl Into<String>, status: impl Display) -> Self {
        Self::ResourceAcquisition {
            op: op.into(),
            status: status.to_string(),
        }
    }

    /// Create a launch error.
    pub fn launch(op: impl Into<String>, status: impl Display) -> Self {
        Self::Launch {
            op: op.into(),
            status: status.to_string(),
        }
    }

    /// Create a compile error carrying the toolchain log.
    pub fn compile(variant: impl Into<String>, log: impl Into<String>) -> Self {
        Self::Compile {
            variant: variant.into(),
            log: log.into(),
        }
    }

    /// Check if this is a compilation error.
    pub fn is_compile_error(&self) -> bool {
        matches!(self, Self::Compile { .. })
    }

    /// Write the diagnostic for this error.
    ///
    /// Compilation errors include the full toolchain log framed by delimiter
    /// lines; everything else is a single line.
    pub fn write_diagnostic<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self)?;
        if let Self::Compile { log, .. } = self {
            writeln!(out, "{}", LOG_HEADER)?;
            write!(out, "{}", log)?;
            if !log.ends_with('\n') {
                writeln!(out)?;
            }
            writeln!(out, "{}", LOG_FOOTER)?;
        }
        Ok(())
    }

    /// Write the diagnostic to stderr.
    pub fn report(&self) {
        let stderr = io::stderr();
        let mut lock = stderr.lock();
        let _ = self.write_diagnostic(&mut lock);
    }
}

/// Uniform status check applied at every device-API call site.
///
/// Converts a backend status into the fatal error class of the call site,
/// naming the failing operation.
pub trait DeviceResultExt<T> {
    /// Classify a failure as [`MixbenchError::ResourceAcquisition`].
    fn or_resource(self, op: &str) -> Result<T>;

    /// Classify a failure as [`MixbenchError::Launch`].
    fn or_launch(self, op: &str) -> Result<T>;
}

impl<T, E: Display> DeviceResultExt<T> for std::result::Result<T, E> {
    fn or_resource(self, op: &str) -> Result<T> {
        self.map_err(|e| MixbenchError::resource(op, e))
    }

    fn or_launch(self, op: &str) -> Result<T> {
        self.map_err(|e| MixbenchError::launch(op, e))
    }
}
