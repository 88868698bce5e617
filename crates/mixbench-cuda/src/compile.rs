//! NVRTC compilation of kernel variants.

use cudarc::nvrtc::{compile_ptx_with_opts, CompileError, CompileOptions, Ptx};
use tracing::debug;

use mixbench_core::error::{MixbenchError, Result};
use mixbench_core::template::KernelSpec;

/// Compile a rendered variant to PTX.
///
/// On failure the full NVRTC program log is carried in
/// [`MixbenchError::Compile`].
pub fn compile_variant(spec: &KernelSpec) -> Result<Ptx> {
    let opts = CompileOptions {
        options: vec!["--std=c++14".to_string()],
        ..Default::default()
    };
    let ptx = compile_ptx_with_opts(spec.source(), opts)
        .map_err(|e| MixbenchError::compile(spec.name(), program_log(&e)))?;
    debug!("NVRTC compiled {}", spec.name());
    Ok(ptx)
}

fn program_log(err: &CompileError) -> String {
    match err {
        CompileError::CompileError { log, .. } => log.to_string_lossy().into_owned(),
        other => other.to_string(),
    }
}
