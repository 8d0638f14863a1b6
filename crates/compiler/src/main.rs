//! Ignis Compiler CLI
//!
//! Command-line interface for compiling .ign programs to executables
//! through the native or C++ back-end, and for running the checker alone.

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{Shell, generate};
use ignisc::{BuildConfig, ProjectConfig, Target};
use std::io;
use std::path::{Path, PathBuf};
use std::process;

#[derive(ClapParser)]
#[command(name = "ignisc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ignis compiler - compile .ign programs to executables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .ign file to an executable
    Build {
        /// Input .ign source file
        input: PathBuf,

        /// Output executable path (defaults to input filename without .ign extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compilation target: 'asm' (default) or 'cpp'
        #[arg(long)]
        target: Option<String>,

        /// Stop after assembly generation (only for 'asm' target)
        #[arg(short = 'S')]
        stop_after_asm: bool,

        /// Stop after object file generation (only for 'asm' target)
        #[arg(short = 'c')]
        stop_after_object: bool,

        /// Keep intermediate files
        #[arg(short = 'k', long)]
        keep_files: bool,
    },

    /// Parse and type-check a .ign file without generating code
    Check {
        /// Input .ign source file
        input: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            target,
            stop_after_asm,
            stop_after_object,
            keep_files,
        } => {
            let output = output.unwrap_or_else(|| {
                let stem = input.file_stem().unwrap_or_default();
                PathBuf::from(stem)
            });
            run_build(&input, &output, target.as_deref(), stop_after_asm, stop_after_object, keep_files);
        }
        Commands::Check { input } => {
            run_check(&input);
        }
        Commands::Completions { shell } => {
            run_completions(shell);
        }
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "ignisc", &mut io::stdout());
}

/// Build the effective config: defaults, then an optional `ignis.toml`
/// next to the input, then explicit flags on top.
fn effective_config(
    input: &Path,
    target: Option<&str>,
    stop_after_asm: bool,
    stop_after_object: bool,
    keep_files: bool,
) -> Result<BuildConfig, String> {
    let mut config = BuildConfig::new();

    let project_dir = input.parent().unwrap_or_else(|| Path::new("."));
    if let Some(project) = ProjectConfig::load(project_dir)? {
        project.apply(&mut config)?;
    }

    if let Some(target) = target {
        config.target = Target::parse(target)?;
    }
    if keep_files {
        config.keep_files = true;
    }
    config.stop_after_asm = stop_after_asm;
    config.stop_after_object = stop_after_object;
    Ok(config)
}

fn run_build(
    input: &Path,
    output: &Path,
    target: Option<&str>,
    stop_after_asm: bool,
    stop_after_object: bool,
    keep_files: bool,
) {
    let config = match effective_config(input, target, stop_after_asm, stop_after_object, keep_files) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match ignisc::compile_file(input, output, &config) {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                eprint!("{}", warning);
            }
            println!("Compiled {} -> {}", input.display(), outcome.artifact.display());
        }
        Err(e) => {
            eprintln!("{}", e.trim_end());
            eprintln!("\nCompilation failed due to previous errors.");
            process::exit(1);
        }
    }
}

fn run_check(input: &Path) {
    let source = match std::fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", input.display(), e);
            process::exit(1);
        }
    };

    match ignisc::check_source(&source, input) {
        Ok(warnings) => {
            for warning in &warnings {
                eprint!("{}", warning);
            }
            println!(
                "{}: no errors ({} warning(s))",
                input.display(),
                warnings.len()
            );
        }
        Err(e) => {
            eprintln!("{}", e.trim_end());
            process::exit(1);
        }
    }
}
