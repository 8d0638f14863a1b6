//! Build configuration
//!
//! `BuildConfig` carries the driver's knobs. Projects may keep defaults in
//! an `ignis.toml` next to the source file:
//!
//! ```toml
//! [build]
//! target = "cpp"
//! keep-files = true
//! ```
//!
//! The file is merged beneath command-line flags: a flag given explicitly
//! always wins.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Compilation target. The two back-ends are mutually exclusive per
/// compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// x86-64 NASM assembly, assembled and linked into an ELF executable
    #[default]
    Asm,
    /// C++17 source, compiled against the embedded runtime
    Cpp,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Asm => "asm",
            Target::Cpp => "cpp",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "asm" => Ok(Target::Asm),
            "cpp" => Ok(Target::Cpp),
            other => Err(format!("Unknown compilation target '{}'. Use 'asm' or 'cpp'.", other)),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for one driver invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    pub target: Target,
    /// Keep intermediate files (.asm/.o or .cpp) in the build directory
    pub keep_files: bool,
    /// Stop after emitting assembly (native target only)
    pub stop_after_asm: bool,
    /// Stop after assembling the object file (native target only)
    pub stop_after_object: bool,
}

impl BuildConfig {
    pub fn new() -> Self {
        BuildConfig::default()
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_keep_files(mut self, keep: bool) -> Self {
        self.keep_files = keep;
        self
    }
}

/// Project defaults parsed from `ignis.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    build: BuildSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct BuildSection {
    target: Option<String>,
    #[serde(rename = "keep-files")]
    keep_files: Option<bool>,
}

impl ProjectConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse ignis.toml: {}", e))
    }

    /// Load `ignis.toml` from the given directory if present.
    pub fn load(dir: &Path) -> Result<Option<Self>, String> {
        let path = dir.join("ignis.toml");
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml(&content).map(Some)
    }

    /// Fold the file's defaults into a config. Only fields the file sets
    /// are touched; callers apply CLI flags afterwards.
    pub fn apply(&self, config: &mut BuildConfig) -> Result<(), String> {
        if let Some(target) = &self.build.target {
            config.target = Target::parse(target)?;
        }
        if let Some(keep) = self.build.keep_files {
            config.keep_files = keep;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parse() {
        assert_eq!(Target::parse("asm").unwrap(), Target::Asm);
        assert_eq!(Target::parse("cpp").unwrap(), Target::Cpp);
        assert!(Target::parse("llvm").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = BuildConfig::new();
        assert_eq!(config.target, Target::Asm);
        assert!(!config.keep_files);
        assert!(!config.stop_after_asm);
    }

    #[test]
    fn test_builder() {
        let config = BuildConfig::new().with_target(Target::Cpp).with_keep_files(true);
        assert_eq!(config.target, Target::Cpp);
        assert!(config.keep_files);
    }

    #[test]
    fn test_project_config_applies() {
        let project = ProjectConfig::from_toml("[build]\ntarget = \"cpp\"\nkeep-files = true\n").unwrap();
        let mut config = BuildConfig::new();
        project.apply(&mut config).unwrap();
        assert_eq!(config.target, Target::Cpp);
        assert!(config.keep_files);
    }

    #[test]
    fn test_project_config_partial() {
        let project = ProjectConfig::from_toml("[build]\nkeep-files = true\n").unwrap();
        let mut config = BuildConfig::new();
        project.apply(&mut config).unwrap();
        // Unset fields keep their defaults.
        assert_eq!(config.target, Target::Asm);
        assert!(config.keep_files);
    }

    #[test]
    fn test_project_config_empty() {
        let project = ProjectConfig::from_toml("").unwrap();
        let mut config = BuildConfig::new();
        project.apply(&mut config).unwrap();
        assert_eq!(config.target, Target::Asm);
    }

    #[test]
    fn test_project_config_bad_target() {
        let project = ProjectConfig::from_toml("[build]\ntarget = \"wasm\"\n").unwrap();
        let mut config = BuildConfig::new();
        assert!(project.apply(&mut config).is_err());
    }
}
