//! `adac` command-line interface.

use adac::config::OptimizationLevel;
use adac::CompilerConfig;
use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "adac")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compiler for the Ada-family language this workspace implements", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file to an executable
    Build {
        /// Input source file
        input: PathBuf,

        /// Output executable path (defaults to the input filename without its extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the intermediate textual IR file (.ll)
        #[arg(long)]
        keep_ir: bool,

        /// Stop after emitting the .ll file; don't invoke clang
        #[arg(long)]
        emit_ir_only: bool,

        /// Optimization level passed to clang
        #[arg(short = 'O', value_enum, default_value = "o0")]
        optimize: OptLevelArg,

        /// Suppress a check compiler-wide (repeatable): range, index, null,
        /// division, overflow, discriminant, all
        #[arg(long = "suppress", value_name = "CHECK")]
        suppress: Vec<String>,
    },

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OptLevelArg {
    O0,
    O1,
    O2,
    O3,
}

impl From<OptLevelArg> for OptimizationLevel {
    fn from(value: OptLevelArg) -> Self {
        match value {
            OptLevelArg::O0 => OptimizationLevel::O0,
            OptLevelArg::O1 => OptimizationLevel::O1,
            OptLevelArg::O2 => OptimizationLevel::O2,
            OptLevelArg::O3 => OptimizationLevel::O3,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            keep_ir,
            emit_ir_only,
            optimize,
            suppress,
        } => {
            let output = output.unwrap_or_else(|| {
                let stem = input.file_stem().unwrap_or_default();
                PathBuf::from(stem)
            });
            run_build(&input, &output, keep_ir, emit_ir_only, optimize.into(), &suppress);
        }
        Commands::Completions { shell } => run_completions(shell),
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "adac", &mut io::stdout());
}

/// Runs a build, exiting with the codes documented for the CLI: 0 on
/// success, 1 when the source fails to compile, 2 on a usage/environment
/// error (bad arguments, missing clang).
fn run_build(
    input: &PathBuf,
    output: &PathBuf,
    keep_ir: bool,
    emit_ir_only: bool,
    optimize: OptimizationLevel,
    suppress: &[String],
) {
    if !input.exists() {
        eprintln!("Error: input file '{}' does not exist", input.display());
        process::exit(2);
    }

    let mut config = CompilerConfig::new()
        .with_optimization_level(optimize)
        .with_emit_ir_only(emit_ir_only)
        .with_keep_ir(keep_ir);
    for check in suppress {
        config = config.with_suppressed_check(check.clone());
    }

    tracing::debug!(input = %input.display(), output = %output.display(), "starting build");

    match adac::compile_file_with_config(input, output, &config) {
        Ok(()) => {
            tracing::info!(input = %input.display(), output = %output.display(), "build succeeded");
            println!("Compiled {} -> {}", input.display(), output.display());
            if keep_ir || emit_ir_only {
                let ir_path = output.with_extension("ll");
                if ir_path.exists() {
                    println!("IR saved to {}", ir_path.display());
                }
            }
        }
        Err(e @ adac::CompileError::Io(_)) | Err(e @ adac::CompileError::Link(_)) => {
            tracing::warn!(input = %input.display(), error = %e, "build aborted by an environment error");
            eprintln!("Error: {e}");
            process::exit(2);
        }
        Err(e) => {
            tracing::warn!(input = %input.display(), error = %e, "build failed");
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
