//! Embedded C++ Runtime
//!
//! The runtime sources are embedded at compile time so `ignisc` is fully
//! self-contained: C++ builds materialize them into the build directory
//! next to the generated translation unit.

use std::fs;
use std::io;
use std::path::Path;

pub static RUNTIME_HEADER: &str = include_str!("../runtime/ignis_runtime.h");
pub static RUNTIME_SOURCE: &str = include_str!("../runtime/ignis_runtime.cpp");

pub const RUNTIME_HEADER_NAME: &str = "ignis_runtime.h";
pub const RUNTIME_SOURCE_NAME: &str = "ignis_runtime.cpp";

/// Write both runtime files into `dir`, returning the path of the source
/// file to hand to the C++ compiler.
pub fn materialize(dir: &Path) -> io::Result<std::path::PathBuf> {
    fs::write(dir.join(RUNTIME_HEADER_NAME), RUNTIME_HEADER)?;
    let source_path = dir.join(RUNTIME_SOURCE_NAME);
    fs::write(&source_path, RUNTIME_SOURCE)?;
    Ok(source_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_declares_intrinsics() {
        assert!(RUNTIME_HEADER.contains("char *ignis_alloc(int64_t size);"));
        assert!(RUNTIME_HEADER.contains("int64_t print_int(int64_t value);"));
        assert!(RUNTIME_HEADER.contains("int64_t ignis_putchar(char c);"));
        assert!(RUNTIME_HEADER.contains("int64_t ignis_getchar();"));
        assert!(RUNTIME_HEADER.contains("void ignis_free(void *ptr);"));
    }

    #[test]
    fn test_runtime_source_includes_header() {
        assert!(RUNTIME_SOURCE.contains("#include \"ignis_runtime.h\""));
        assert!(RUNTIME_SOURCE.contains("std::malloc"));
    }

    #[test]
    fn test_materialize_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = materialize(dir.path()).unwrap();
        assert!(source.ends_with(RUNTIME_SOURCE_NAME));
        assert!(dir.path().join(RUNTIME_HEADER_NAME).exists());
        assert!(dir.path().join(RUNTIME_SOURCE_NAME).exists());
    }
}
