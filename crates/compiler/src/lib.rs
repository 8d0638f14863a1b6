//! Ignis Compiler Library
//!
//! Provides compilation from `.ign` source to x86-64 assembly (assembled
//! and linked into an ELF executable with `nasm` and `ld`) or to C++17
//! source (compiled with `g++` against the embedded runtime).
//!
//! The pipeline is strictly linear: source → tokens → AST → checked AST →
//! one of the two back-ends. Each stage consumes the previous stage's
//! output; a fatal diagnostic propagates out as the formatted report and no
//! later stage runs.
//!
//! ```rust,ignore
//! use std::path::Path;
//!
//! let out = ignisc::compile_to_asm("int main() { return 0; }", Path::new("demo.ign"))?;
//! println!("{}", out.code);
//! ```

pub mod ast;
pub mod checker;
pub mod codegen;
pub mod codegen_cpp;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod pretty;
pub mod runtime_embed;

pub use ast::Program;
pub use checker::Checker;
pub use codegen::CodeGen;
pub use codegen_cpp::CodeGenCpp;
pub use config::{BuildConfig, ProjectConfig, Target};
pub use diagnostics::Reporter;
pub use lexer::Lexer;
pub use parser::Parser;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

/// Minimum g++ major version. The generated source is C++17.
const MIN_GXX_VERSION: u32 = 7;

/// Cache for external tool probes; each runs once per process.
static NASM_CHECKED: OnceLock<Result<(), String>> = OnceLock::new();
static LD_CHECKED: OnceLock<Result<(), String>> = OnceLock::new();
static GXX_CHECKED: OnceLock<Result<u32, String>> = OnceLock::new();

/// Generated text plus the warnings the checker accumulated.
#[derive(Debug)]
pub struct CompileOutput {
    pub code: String,
    pub warnings: Vec<String>,
}

/// What `compile_file` produced and where.
#[derive(Debug)]
pub struct BuildOutcome {
    pub artifact: PathBuf,
    pub warnings: Vec<String>,
}

fn front_end(source: &str, path: &Path) -> Result<(Program, Reporter), String> {
    let reporter = Reporter::new(path, source);
    let program = {
        let lexer = Lexer::new(source, &reporter);
        let mut parser = Parser::new(lexer, &reporter)?;
        parser.parse()?
    };
    Ok((program, reporter))
}

fn require_main(program: &Program) -> Result<(), String> {
    let has_main = program
        .decls
        .iter()
        .any(|d| matches!(d, ast::Decl::Function(f) if f.name == "main"));
    if has_main {
        Ok(())
    } else {
        Err("No 'main' function defined".to_string())
    }
}

/// Compile source text to NASM assembly.
pub fn compile_to_asm(source: &str, path: &Path) -> Result<CompileOutput, String> {
    let (program, mut reporter) = front_end(source, path)?;
    require_main(&program)?;
    {
        let mut checker = Checker::new(&mut reporter);
        checker.check(&program)?;
    }
    let code = {
        let mut generator = CodeGen::new(&reporter);
        generator.generate(&program)?
    };
    Ok(CompileOutput { code, warnings: reporter.take_warnings() })
}

/// Compile source text to C++17 source.
pub fn compile_to_cpp(source: &str, path: &Path) -> Result<CompileOutput, String> {
    let (program, mut reporter) = front_end(source, path)?;
    require_main(&program)?;
    {
        let mut checker = Checker::new(&mut reporter);
        checker.check(&program)?;
    }
    let code = {
        let mut generator = CodeGenCpp::new(&reporter);
        generator.generate(&program)?
    };
    Ok(CompileOutput { code, warnings: reporter.take_warnings() })
}

/// Parse and type-check only; returns the accumulated warnings.
pub fn check_source(source: &str, path: &Path) -> Result<Vec<String>, String> {
    let (program, mut reporter) = front_end(source, path)?;
    require_main(&program)?;
    {
        let mut checker = Checker::new(&mut reporter);
        checker.check(&program)?;
    }
    Ok(reporter.take_warnings())
}

/// Compile a `.ign` source file to an executable (or stop earlier per the
/// config). Intermediates live in `.build/<stem>/` next to the output and
/// are removed afterwards unless `keep_files` is set.
pub fn compile_file(input: &Path, output: &Path, config: &BuildConfig) -> Result<BuildOutcome, String> {
    let source = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read source file '{}': {}", input.display(), e))?;

    let stem = output
        .file_name()
        .ok_or_else(|| format!("Invalid output path '{}'", output.display()))?
        .to_string_lossy()
        .to_string();
    let parent = output.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let build_dir = parent.join(".build").join(&stem);
    fs::create_dir_all(&build_dir)
        .map_err(|e| format!("Failed to create build directory '{}': {}", build_dir.display(), e))?;

    match config.target {
        Target::Asm => {
            let out = compile_to_asm(&source, input)?;
            let asm_path = build_dir.join(format!("{}.asm", stem));
            fs::write(&asm_path, &out.code)
                .map_err(|e| format!("Failed to write assembly file: {}", e))?;
            if config.stop_after_asm {
                return Ok(BuildOutcome { artifact: asm_path, warnings: out.warnings });
            }

            check_nasm()?;
            let obj_path = build_dir.join(format!("{}.o", stem));
            run_tool(
                Command::new("nasm").args(["-f", "elf64", "-o"]).arg(&obj_path).arg(&asm_path),
                "nasm",
            )?;
            if config.stop_after_object {
                if !config.keep_files {
                    fs::remove_file(&asm_path).ok();
                }
                return Ok(BuildOutcome { artifact: obj_path, warnings: out.warnings });
            }

            check_ld()?;
            run_tool(Command::new("ld").arg("-o").arg(output).arg(&obj_path), "ld")?;

            if !config.keep_files {
                fs::remove_file(&asm_path).ok();
                fs::remove_file(&obj_path).ok();
                remove_dir_if_empty(&build_dir);
            }
            Ok(BuildOutcome { artifact: output.to_path_buf(), warnings: out.warnings })
        }
        Target::Cpp => {
            let out = compile_to_cpp(&source, input)?;
            let cpp_path = build_dir.join(format!("{}.cpp", stem));
            fs::write(&cpp_path, &out.code)
                .map_err(|e| format!("Failed to write C++ file: {}", e))?;

            check_gxx_version()?;
            let runtime_source = runtime_embed::materialize(&build_dir)
                .map_err(|e| format!("Failed to write runtime files: {}", e))?;
            run_tool(
                Command::new("g++")
                    .arg("-std=c++17")
                    .arg(format!("-I{}", build_dir.display()))
                    .arg("-o")
                    .arg(output)
                    .arg(&cpp_path)
                    .arg(&runtime_source),
                "g++",
            )?;

            if !config.keep_files {
                fs::remove_file(&cpp_path).ok();
                fs::remove_file(&runtime_source).ok();
                fs::remove_file(build_dir.join(runtime_embed::RUNTIME_HEADER_NAME)).ok();
                remove_dir_if_empty(&build_dir);
            }
            Ok(BuildOutcome { artifact: output.to_path_buf(), warnings: out.warnings })
        }
    }
}

fn remove_dir_if_empty(dir: &Path) {
    if fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(false) {
        fs::remove_dir(dir).ok();
        if let Some(parent) = dir.parent() {
            if fs::read_dir(parent).map(|mut d| d.next().is_none()).unwrap_or(false) {
                fs::remove_dir(parent).ok();
            }
        }
    }
}

fn run_tool(command: &mut Command, name: &str) -> Result<(), String> {
    let output = command
        .output()
        .map_err(|e| format!("Failed to run {}: {}", name, e))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{} failed:\n{}", name, stderr));
    }
    Ok(())
}

fn check_tool(cell: &OnceLock<Result<(), String>>, name: &str) -> Result<(), String> {
    cell.get_or_init(|| {
        Command::new(name)
            .arg("--version")
            .output()
            .map(|_| ())
            .map_err(|e| format!("Failed to run {}: {}. Please install {}.", name, e, name))
    })
    .clone()
}

fn check_nasm() -> Result<(), String> {
    check_tool(&NASM_CHECKED, "nasm")
}

fn check_ld() -> Result<(), String> {
    check_tool(&LD_CHECKED, "ld")
}

/// Check that g++ is available and new enough for `-std=c++17`.
/// Cached; runs once per process.
fn check_gxx_version() -> Result<u32, String> {
    GXX_CHECKED
        .get_or_init(|| {
            let output = Command::new("g++").arg("--version").output().map_err(|e| {
                format!("Failed to run g++: {}. Please install g++ {} or later.", e, MIN_GXX_VERSION)
            })?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(format!(
                    "g++ --version failed with exit code {:?}: {}",
                    output.status.code(),
                    stderr
                ));
            }
            let version_str = String::from_utf8_lossy(&output.stdout);
            let version = parse_gxx_version(&version_str).ok_or_else(|| {
                format!(
                    "Could not parse g++ version from: {}\nignisc requires g++ {} or later (for C++17).",
                    version_str.lines().next().unwrap_or(&version_str),
                    MIN_GXX_VERSION
                )
            })?;
            if version < MIN_GXX_VERSION {
                return Err(format!(
                    "g++ version {} detected, but ignisc requires {} or later.\n\
                     The generated code uses C++17.\n\
                     Please upgrade your g++ installation.",
                    version, MIN_GXX_VERSION
                ));
            }
            Ok(version)
        })
        .clone()
}

/// Parse the major version from `g++ --version` output like
/// "g++ (Ubuntu 12.3.0-1ubuntu1~22.04) 12.3.0" or "g++ (GCC) 13.2.1".
fn parse_gxx_version(output: &str) -> Option<u32> {
    let line = output.lines().next()?;
    for token in line.split_whitespace().rev() {
        if !token.contains('.') {
            continue;
        }
        let major: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !major.is_empty() {
            return major.parse().ok();
        }
    }
    None
}
