//! Diagnostic reporting for the Ignis compiler
//!
//! One `Reporter` exists per compilation unit. It owns the source text split
//! into lines and renders every diagnostic in a stable, editor-parseable
//! format:
//!
//! ```text
//! error SE009: Cannot assign to immutable variable 'x'.
//! --> examples/demo.ign:4:5
//!
//!    2 | int main() {
//!    3 |     int x = 1;
//!    4 |     x = 2;
//!        ^
//!    5 |     return 0;
//! ```
//!
//! Lexical and syntactic errors are fatal: the stage formats the report and
//! returns it as the `Err` payload immediately. Semantic errors accumulate
//! on the reporter over the checker pass and are joined afterwards. Warnings
//! always accumulate and are drained by the driver onto stderr.

use std::fmt;
use std::path::PathBuf;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Prevents compilation
    Error,
    /// Reported but does not prevent compilation
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// Collects and formats diagnostics for one compilation unit
pub struct Reporter {
    file: PathBuf,
    lines: Vec<String>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Reporter {
    pub fn new(file: impl Into<PathBuf>, source: &str) -> Self {
        Reporter {
            file: file.into(),
            lines: source.lines().map(|l| l.to_string()).collect(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Format a diagnostic without recording it.
    ///
    /// Used by the stages that fail fast (lexer, parser, code generators):
    /// the rendered report becomes the `Err` payload and propagates out of
    /// the pipeline on its own.
    pub fn render(&self, level: Level, code: &str, message: &str, line: usize, column: usize) -> String {
        let mut out = format!("{} {}: {}\n", level, code, message);
        out.push_str(&format!("--> {}:{}:{}\n\n", self.file.display(), line, column));

        // Snippet window around the offending line, 1-based input.
        let start = line.saturating_sub(3);
        let end = (line + 2).min(self.lines.len());
        for i in start..end {
            let gutter = format!("{:4} | ", i + 1);
            out.push_str(&gutter);
            out.push_str(&self.lines[i]);
            out.push('\n');
            if i + 1 == line {
                let padding = " ".repeat(gutter.len() + column.saturating_sub(1));
                out.push_str(&padding);
                out.push_str("^\n");
            }
        }
        out
    }

    /// Record an error and return the formatted report.
    pub fn error(&mut self, code: &str, message: &str, line: usize, column: usize) -> String {
        let report = self.render(Level::Error, code, message, line, column);
        self.errors.push(report.clone());
        report
    }

    /// Record a warning.
    pub fn warning(&mut self, code: &str, message: &str, line: usize, column: usize) {
        let report = self.render(Level::Warning, code, message, line, column);
        self.warnings.push(report);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Join all recorded errors into a single report, or `None` if the
    /// compilation is still clean.
    pub fn error_report(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.join("\n"))
        }
    }

    /// Move the accumulated warnings out of the reporter.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporter() -> Reporter {
        Reporter::new("demo.ign", "int main() {\n    int x = 1;\n    x = 2;\n}\n")
    }

    #[test]
    fn test_level_display() {
        assert_eq!(format!("{}", Level::Error), "error");
        assert_eq!(format!("{}", Level::Warning), "warning");
    }

    #[test]
    fn test_render_header_and_location() {
        let r = reporter();
        let report = r.render(Level::Error, "SE009", "Cannot assign to immutable variable 'x'.", 3, 5);
        assert!(report.starts_with("error SE009: Cannot assign to immutable variable 'x'.\n"));
        assert!(report.contains("--> demo.ign:3:5"));
    }

    #[test]
    fn test_render_snippet_pointer() {
        let r = reporter();
        let report = r.render(Level::Error, "E001", "boom", 2, 9);
        // The offending line is echoed with its gutter, and a caret sits
        // under column 9 (7 gutter chars + 8 spaces).
        assert!(report.contains("   2 |     int x = 1;"));
        assert!(report.contains(&format!("\n{}^\n", " ".repeat(7 + 8))));
    }

    #[test]
    fn test_errors_accumulate() {
        let mut r = reporter();
        assert!(!r.has_errors());
        r.error("SE004", "dup", 1, 1);
        r.error("SE007", "mismatch", 2, 1);
        assert!(r.has_errors());
        assert_eq!(r.error_count(), 2);
        let joined = r.error_report().unwrap();
        assert!(joined.contains("SE004"));
        assert!(joined.contains("SE007"));
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let mut r = reporter();
        r.warning("W001", "dead loop", 1, 1);
        assert!(!r.has_errors());
        assert_eq!(r.warning_count(), 1);
        let drained = r.take_warnings();
        assert_eq!(drained.len(), 1);
        assert!(drained[0].starts_with("warning W001"));
        assert_eq!(r.warning_count(), 0);
    }

    #[test]
    fn test_snippet_clamps_at_file_start() {
        let r = Reporter::new("a.ign", "int main() { return 0; }");
        let report = r.render(Level::Error, "E001", "x", 1, 1);
        assert!(report.contains("   1 | int main() { return 0; }"));
    }
}
