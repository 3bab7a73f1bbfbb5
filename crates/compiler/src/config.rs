//! Compiler configuration.
//!
//! Bundles the options that vary per invocation — optimization level, which
//! checks to suppress compiler-wide (in addition to any per-unit `pragma
//! Suppress`), and how far through the pipeline to run — so `lib.rs` and
//! `main.rs` share one source of truth instead of threading a dozen
//! individual flags through `compile_file`.

use std::path::PathBuf;

/// Optimization level passed through to clang when linking the generated IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationLevel {
    #[default]
    O0,
    O1,
    O2,
    O3,
}

impl OptimizationLevel {
    pub fn as_clang_flag(&self) -> &'static str {
        match self {
            OptimizationLevel::O0 => "-O0",
            OptimizationLevel::O1 => "-O1",
            OptimizationLevel::O2 => "-O2",
            OptimizationLevel::O3 => "-O3",
        }
    }
}

/// Configuration for a single compilation.
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    /// Checks to suppress compiler-wide, in addition to per-unit `pragma
    /// Suppress`. Names match `typechecker::SuppressedChecks::canonicalize`
    /// (e.g. "range", "overflow", "all").
    pub suppressed_checks: Vec<String>,

    /// Optimization level for the clang invocation.
    pub optimization_level: OptimizationLevel,

    /// Stop after emitting the `.ll` file; skip invoking clang.
    pub emit_ir_only: bool,

    /// Keep the generated `.ll` file alongside the output binary instead of
    /// deleting it after a successful link.
    pub keep_ir: bool,

    /// Additional library search paths for the final link step.
    pub library_paths: Vec<PathBuf>,
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_suppressed_check(mut self, check: impl Into<String>) -> Self {
        self.suppressed_checks.push(check.into());
        self
    }

    pub fn with_optimization_level(mut self, level: OptimizationLevel) -> Self {
        self.optimization_level = level;
        self
    }

    pub fn with_emit_ir_only(mut self, emit_ir_only: bool) -> Self {
        self.emit_ir_only = emit_ir_only;
        self
    }

    pub fn with_keep_ir(mut self, keep_ir: bool) -> Self {
        self.keep_ir = keep_ir;
        self
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_paths.push(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_suppressed_checks() {
        let config = CompilerConfig::new()
            .with_suppressed_check("range")
            .with_suppressed_check("overflow");
        assert_eq!(config.suppressed_checks, vec!["range", "overflow"]);
    }

    #[test]
    fn default_optimization_level_is_o0() {
        assert_eq!(OptimizationLevel::default().as_clang_flag(), "-O0");
    }
}
