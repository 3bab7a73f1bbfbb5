//! Ada-like compiler front end and code generator.
//!
//! Compiles a single compilation-unit source file through the full
//! pipeline — lex, parse, resolve, typecheck, generate — and, unless the
//! caller only wants the IR, invokes clang to assemble and link the result
//! against the `ada_rt` runtime staticlib.
//!
//! # Extending the compiler
//!
//! ```rust,ignore
//! use adac::{CompilerConfig, OptimizationLevel};
//! use adac::compile_file_with_config;
//!
//! let config = CompilerConfig::new()
//!     .with_optimization_level(OptimizationLevel::O2)
//!     .with_suppressed_check("overflow");
//!
//! compile_file_with_config(source_path, output_path, &config)?;
//! ```

pub mod ast;
pub mod codegen;
pub mod config;
pub mod elaboration;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod typechecker;
pub mod types;

pub use ast::Program;
pub use codegen::CodeGenError;
pub use config::{CompilerConfig, OptimizationLevel};
pub use elaboration::ElaborationError;
pub use lexer::{FileId, LexError};
pub use parser::ParseError;
pub use resolver::{Environment, SemanticError};
pub use typechecker::TypeChecker;

use std::fmt;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

/// Embedded runtime staticlib (built by build.rs). On docs.rs the runtime
/// isn't available, so the slice is empty there.
#[cfg(not(docsrs))]
static RUNTIME_LIB: &[u8] = include_bytes!(env!("ADA_RUNTIME_LIB_PATH"));

#[cfg(docsrs)]
static RUNTIME_LIB: &[u8] = &[];

/// Minimum clang version required: the generated IR uses opaque pointers,
/// which need LLVM 15+.
const MIN_CLANG_VERSION: u32 = 15;

static CLANG_VERSION_CHECKED: OnceLock<Result<u32, String>> = OnceLock::new();

/// Every way a compilation can fail, in pipeline order.
#[derive(Debug)]
pub enum CompileError {
    Io(String),
    Lex(Vec<LexError>),
    Parse(Vec<ParseError>),
    Semantic(Vec<SemanticError>),
    Elaboration(ElaborationError),
    CodeGen(CodeGenError),
    Link(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Io(msg) => write!(f, "{msg}"),
            CompileError::Lex(errs) => {
                for e in errs {
                    writeln!(f, "lex error: {}", e.message)?;
                }
                Ok(())
            }
            CompileError::Parse(errs) => {
                for e in errs {
                    writeln!(f, "parse error: {}", e.message)?;
                }
                Ok(())
            }
            CompileError::Semantic(errs) => {
                for e in errs {
                    writeln!(f, "{}", e.message)?;
                }
                Ok(())
            }
            CompileError::Elaboration(e) => write!(f, "{}", e.message),
            CompileError::CodeGen(e) => write!(f, "{e}"),
            CompileError::Link(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CompileError {}

fn check_clang_version() -> Result<u32, String> {
    CLANG_VERSION_CHECKED
        .get_or_init(|| {
            let output = Command::new("clang")
                .arg("--version")
                .output()
                .map_err(|e| {
                    format!("Failed to run clang: {e}. Please install clang {MIN_CLANG_VERSION} or later.")
                })?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(format!(
                    "clang --version failed with exit code {:?}: {stderr}",
                    output.status.code()
                ));
            }
            let version_str = String::from_utf8_lossy(&output.stdout);
            let version = parse_clang_version(&version_str).ok_or_else(|| {
                format!(
                    "Could not parse clang version from: {}\nadac requires clang {MIN_CLANG_VERSION} or later (for opaque pointer support).",
                    version_str.lines().next().unwrap_or(&version_str)
                )
            })?;
            let is_apple = version_str.contains("Apple clang");
            let effective_min = if is_apple { 14 } else { MIN_CLANG_VERSION };
            if version < effective_min {
                return Err(format!(
                    "clang version {version} detected, but adac requires {} {effective_min} or later.",
                    if is_apple { "Apple clang" } else { "clang" }
                ));
            }
            Ok(version)
        })
        .clone()
}

fn parse_clang_version(output: &str) -> Option<u32> {
    for line in output.lines() {
        if line.contains("clang version")
            && let Some(idx) = line.find("version ")
        {
            let after_version = &line[idx + 8..];
            let major: String = after_version
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if !major.is_empty() {
                return major.parse().ok();
            }
        }
    }
    None
}

/// Lexes, parses, resolves, and typechecks `source`, returning the typed IR
/// in elaboration order. Does not run codegen or touch the filesystem other
/// than reading nothing (the caller already has the source text) — used by
/// both `compile_file_with_config` and tests that only want to exercise the
/// front end.
pub fn check(source: &str, config: &CompilerConfig) -> Result<Vec<ir::Unit>, CompileError> {
    let file = FileId(0);
    let (tokens, lex_errors) = lexer::tokenize(file, source);
    tracing::trace!(tokens = tokens.len(), "lexed source");
    if !lex_errors.is_empty() {
        tracing::debug!(errors = lex_errors.len(), "lexing failed");
        return Err(CompileError::Lex(lex_errors));
    }

    let parser = parser::Parser::new(file, &tokens);
    let (program, parse_errors) = parser.parse_program();
    if !parse_errors.is_empty() {
        tracing::debug!(errors = parse_errors.len(), "parsing failed");
        return Err(CompileError::Parse(parse_errors));
    }

    let (environment, semantic_errors) = resolver::build_environment(&program);
    if !semantic_errors.is_empty() {
        tracing::debug!(errors = semantic_errors.len(), "name resolution failed");
        return Err(CompileError::Semantic(semantic_errors));
    }

    let ordered = elaboration::ordered_units(program).map_err(CompileError::Elaboration)?;

    let mut checker = TypeChecker::new(&environment);
    for check_name in &config.suppressed_checks {
        checker.suppress(check_name);
    }
    let units = checker.check_program(&ordered);
    if !checker.errors().is_empty() {
        tracing::debug!(errors = checker.errors().len(), "type checking failed");
        return Err(CompileError::Semantic(checker.errors().to_vec()));
    }

    tracing::trace!(units = units.len(), "front end produced typed units");
    Ok(units)
}

/// Compiles `source` straight to textual IR, without invoking clang.
pub fn compile_to_ir(source: &str, config: &CompilerConfig) -> Result<String, CompileError> {
    let units = check(source, config)?;
    Ok(codegen::emit_program(&units))
}

/// Compiles a source file to an executable.
pub fn compile_file(source_path: &Path, output_path: &Path) -> Result<(), CompileError> {
    compile_file_with_config(source_path, output_path, &CompilerConfig::default())
}

/// Compiles a source file to an executable with custom configuration.
pub fn compile_file_with_config(
    source_path: &Path,
    output_path: &Path,
    config: &CompilerConfig,
) -> Result<(), CompileError> {
    let source = fs::read_to_string(source_path)
        .map_err(|e| CompileError::Io(format!("failed to read '{}': {e}", source_path.display())))?;

    let ir = compile_to_ir(&source, config)?;

    let ir_path = output_path.with_extension("ll");
    fs::write(&ir_path, &ir)
        .map_err(|e| CompileError::Io(format!("failed to write '{}': {e}", ir_path.display())))?;

    if config.emit_ir_only {
        return Ok(());
    }

    check_clang_version().map_err(CompileError::Link)?;

    let runtime_path = std::env::temp_dir().join("libada_rt.a");
    {
        let mut file = fs::File::create(&runtime_path)
            .map_err(|e| CompileError::Io(format!("failed to create runtime lib: {e}")))?;
        file.write_all(RUNTIME_LIB)
            .map_err(|e| CompileError::Io(format!("failed to write runtime lib: {e}")))?;
    }

    let mut clang = Command::new("clang");
    clang
        .arg(config.optimization_level.as_clang_flag())
        .arg("-target")
        .arg(codegen::host_target_triple())
        .arg(&ir_path)
        .arg("-o")
        .arg(output_path)
        .arg("-L")
        .arg(runtime_path.parent().unwrap())
        .arg("-lada_rt");

    for path in &config.library_paths {
        clang.arg("-L").arg(path);
    }

    let output = clang
        .output()
        .map_err(|e| CompileError::Link(format!("failed to run clang: {e}")))?;

    fs::remove_file(&runtime_path).ok();

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CompileError::Link(format!("clang failed:\n{stderr}")));
    }

    if !config.keep_ir {
        fs::remove_file(&ir_path).ok();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_clang_version_standard() {
        let output = "clang version 15.0.0 (https://github.com/llvm/llvm-project)\nTarget: x86_64";
        assert_eq!(parse_clang_version(output), Some(15));
    }

    #[test]
    fn parse_clang_version_apple() {
        let output = "Apple clang version 14.0.3 (clang-1403.0.22.14.1)\nTarget: arm64-apple-darwin";
        assert_eq!(parse_clang_version(output), Some(14));
    }

    #[test]
    fn parse_clang_version_invalid() {
        assert_eq!(parse_clang_version("no version here"), None);
    }

    #[test]
    fn check_reports_parse_errors_without_panicking() {
        let config = CompilerConfig::default();
        let result = check("package is garbage end;", &config);
        assert!(result.is_err());
    }

    #[test]
    fn check_accepts_an_empty_package_spec() {
        let config = CompilerConfig::default();
        let result = check("package P is end P;", &config);
        assert!(result.is_ok());
    }
}
