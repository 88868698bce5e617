//! Kernel template loading and variant specialization.
//!
//! The template is opaque kernel text. It is specialized by prepending a
//! `#define` prelude for the substitution points, so the rendered source is a
//! pure function of [`KernelParams`] and can be checked without a device
//! toolchain.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::config::BenchConfig;
use crate::error::{MixbenchError, Result};
use crate::geometry::LaunchGeometry;
use crate::types::{AddressingMode, ElementType, RatioPoint};

/// Entry point every template must define.
pub const ENTRY_POINT: &str = "benchmark_func";

/// Element type macro.
pub const TYPE_MACRO: &str = "class_T";
/// Block size macro.
pub const BLOCK_MACRO: &str = "blockdim";
/// Memory ratio macro.
pub const RATIO_MACRO: &str = "memory_ratio";
/// Grid size macro (total threads).
pub const GRID_MACRO: &str = "griddim";
/// Addressing-mode flag, defined only for block-strided builds.
pub const BLOCK_STRIDED_FLAG: &str = "BLOCK_STRIDED";

const REQUIRED_IDENTIFIERS: [&str; 6] = [
    TYPE_MACRO,
    BLOCK_MACRO,
    RATIO_MACRO,
    GRID_MACRO,
    BLOCK_STRIDED_FLAG,
    ENTRY_POINT,
];

/// Parameterized kernel source text.
#[derive(Debug, Clone)]
pub struct KernelTemplate {
    origin: String,
    source: String,
}

impl KernelTemplate {
    /// Load a template from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| MixbenchError::TemplateIo {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded kernel template {} ({} bytes)", path.display(), source.len());
        Self::from_source(path.display().to_string(), source)
    }

    /// Build a template from in-memory text.
    pub fn from_source(origin: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let origin = origin.into();
        let source = source.into();

        let missing: Vec<&str> = REQUIRED_IDENTIFIERS
            .iter()
            .copied()
            .filter(|ident| !contains_identifier(&source, ident))
            .collect();
        if !missing.is_empty() {
            return Err(MixbenchError::Template(format!(
                "{} does not reference {}",
                origin,
                missing.join(", ")
            )));
        }

        Ok(Self { origin, source })
    }

    /// Where the template came from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Raw template text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Configuration record of one kernel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct KernelParams {
    /// Scalar type.
    pub element_type: ElementType,
    /// Memory slots per unrolled body.
    pub ratio: RatioPoint,
    /// Threads per block.
    pub block_size: u32,
    /// Total threads, baked as a constant.
    pub grid_size: u64,
    /// Traversal pattern.
    pub addressing: AddressingMode,
    /// Loop iterations per thread.
    pub comp_iterations: u32,
    /// Unrolled body length.
    pub unroll_iterations: u32,
    /// Register rotation width.
    pub regblock_size: u32,
}

impl KernelParams {
    /// Parameters for a variant under `config` and `geometry`.
    pub fn new(
        config: &BenchConfig,
        element_type: ElementType,
        ratio: RatioPoint,
        geometry: &LaunchGeometry,
        addressing: AddressingMode,
    ) -> Self {
        Self {
            element_type,
            ratio,
            block_size: geometry.block_size,
            grid_size: geometry.grid_size,
            addressing,
            comp_iterations: config.comp_iterations,
            unroll_iterations: config.unroll_iterations,
            regblock_size: config.regblock_size,
        }
    }

    /// Unrolled slots that are memory operations.
    pub fn memory_ratio(&self) -> u32 {
        self.ratio.memory_slots()
    }

    /// Stable human-readable name.
    pub fn variant_name(&self) -> String {
        format!(
            "{}<{},r={},{}>",
            ENTRY_POINT,
            self.element_type,
            self.ratio.memory_slots(),
            self.addressing.tag()
        )
    }
}

/// A fully specialized kernel: parameters plus rendered source.
#[derive(Debug, Clone)]
pub struct KernelSpec {
    params: KernelParams,
    source: String,
}

impl KernelSpec {
    /// Specialize `template` for `params`.
    pub fn new(template: &KernelTemplate, params: KernelParams) -> Self {
        let mut source = String::with_capacity(template.source.len() + 256);
        source.push_str(&render_prelude(&params));
        source.push_str(&template.source);
        Self { params, source }
    }

    /// Variant parameters.
    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    /// Rendered source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Entry point to load from the compiled program.
    pub fn entry_point(&self) -> &'static str {
        ENTRY_POINT
    }

    /// Variant name for diagnostics.
    pub fn name(&self) -> String {
        self.params.variant_name()
    }
}

fn render_prelude(params: &KernelParams) -> String {
    let mut prelude = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(prelude, "#define {} {}", TYPE_MACRO, params.element_type.type_name());
    let _ = writeln!(prelude, "#define {} {}", BLOCK_MACRO, params.block_size);
    let _ = writeln!(prelude, "#define {} {}", RATIO_MACRO, params.ratio.memory_slots());
    let _ = writeln!(prelude, "#define {} {}", GRID_MACRO, params.grid_size);
    if params.addressing == AddressingMode::BlockStrided {
        let _ = writeln!(prelude, "#define {}", BLOCK_STRIDED_FLAG);
    }
    let _ = writeln!(prelude, "#define COMP_ITERATIONS {}", params.comp_iterations);
    let _ = writeln!(prelude, "#define UNROLL_ITERATIONS {}", params.unroll_iterations);
    let _ = writeln!(prelude, "#define REGBLOCK_SIZE {}", params.regblock_size);
    prelude
}

fn contains_identifier(text: &str, ident: &str) -> bool {
    let is_ident_char = |c: char| c.is_ascii_alphanumeric() || c == '_';
    text.match_indices(ident).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + ident.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEMPLATE: &str = r#"
extern "C" __global__ void benchmark_func(class_T seed, class_T *data) {
#ifdef BLOCK_STRIDED
    int stride = blockdim;
#else
    int stride = griddim;
#endif
    data[stride * memory_ratio] = seed;
}
"#;

    fn params(addressing: AddressingMode) -> KernelParams {
        let config = BenchConfig::default();
        let geometry = LaunchGeometry::for_sweep(&config, 8 * 1024 * 1024).unwrap();
        KernelParams::new(
            &config,
            ElementType::Float,
            RatioPoint::new(5, 32).unwrap(),
            &geometry,
            addressing,
        )
    }

    #[test]
    fn test_prelude_block_strided() {
        let template = KernelTemplate::from_source("inline", TEMPLATE).unwrap();
        let spec = KernelSpec::new(&template, params(AddressingMode::BlockStrided));
        let source = spec.source();

        assert!(source.starts_with("#define class_T float\n"));
        assert!(source.contains("#define blockdim 256\n"));
        assert!(source.contains("#define memory_ratio 5\n"));
        assert!(source.contains("#define griddim 262144\n"));
        assert!(source.contains("#define BLOCK_STRIDED\n"));
        assert!(source.contains("#define COMP_ITERATIONS 8192\n"));
        assert!(source.ends_with(TEMPLATE));
        assert_eq!(spec.name(), "benchmark_func<float,r=5,block>");
    }

    #[test]
    fn test_prelude_grid_strided() {
        let template = KernelTemplate::from_source("inline", TEMPLATE).unwrap();
        let spec = KernelSpec::new(&template, params(AddressingMode::GridStrided));
        assert!(!spec.source().contains("#define BLOCK_STRIDED"));
        assert_eq!(spec.name(), "benchmark_func<float,r=5,grid>");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let template = KernelTemplate::from_source("inline", TEMPLATE).unwrap();
        let a = KernelSpec::new(&template, params(AddressingMode::BlockStrided));
        let b = KernelSpec::new(&template, params(AddressingMode::BlockStrided));
        assert_eq!(a.source(), b.source());
    }

    #[test]
    fn test_missing_placeholder() {
        let text = TEMPLATE.replace("griddim", "gridDim.x");
        let err = KernelTemplate::from_source("broken.cu", text).unwrap_err();
        assert!(err.to_string().contains("griddim"));
    }

    #[test]
    fn test_identifier_boundaries() {
        assert!(contains_identifier("int blockdim;", "blockdim"));
        assert!(!contains_identifier("int blockdims;", "blockdim"));
        assert!(!contains_identifier("x_griddim", "griddim"));
        assert!(contains_identifier("griddim", "griddim"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEMPLATE.as_bytes()).unwrap();

        let template = KernelTemplate::from_file(file.path()).unwrap();
        assert_eq!(template.source(), TEMPLATE);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = KernelTemplate::from_file(dir.path().join("mix_kernels.cu")).unwrap_err();
        assert!(matches!(err, MixbenchError::TemplateIo { .. }));
    }
}
