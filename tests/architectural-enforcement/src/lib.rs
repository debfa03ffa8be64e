//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - The core crate stays free of UI frameworks
//! - All HTTP goes through the async client
//! - No thread sleeps or panicking shortcuts in production code
//!
//! These tests are designed to catch violations early in the development cycle.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["conductor/core/src", "tui/src"];

/// A line of production code
#[derive(Clone, Debug)]
pub struct SourceLine {
    /// File the line is in
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// Code before any `//` comment
    pub code: String,
}

/// Root of the workspace
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Production lines of every `.rs` file under `dir`
///
/// Comments are stripped and scanning of a file stops at its first
/// `#[cfg(test)]`.
pub fn production_lines(dir: &Path) -> Vec<SourceLine> {
    let mut lines = Vec::new();

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let Ok(content) = fs::read_to_string(path) else {
            continue;
        };

        for (idx, line) in content.lines().enumerate() {
            if line.trim_start().starts_with("#[cfg(test)]") {
                break;
            }
            let code = line.split("//").next().unwrap_or(line).trim();
            if code.is_empty() {
                continue;
            }
            lines.push(SourceLine {
                path: path.to_path_buf(),
                number: idx + 1,
                code: code.to_string(),
            });
        }
    }

    lines
}

/// Lines under the given workspace directories containing any pattern
pub fn find_violations(dirs: &[&str], patterns: &[&str]) -> Vec<String> {
    let root = workspace_root();
    dirs.iter()
        .flat_map(|dir| production_lines(&root.join(dir)))
        .filter(|line| patterns.iter().any(|p| line.code.contains(p)))
        .map(|line| format!("{}:{} - {}", line.path.display(), line.number, line.code))
        .collect()
}

/// Fail with a readable report when there are violations
pub fn assert_clean(rule: &str, violations: &[String]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {rule}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!("\nFound {} violation(s): {rule}", violations.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_has_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }

    #[test]
    fn test_production_lines_skip_comments_and_tests() {
        let dir = tempfile_dir();
        fs::write(
            dir.join("sample.rs"),
            "// comment\nfn a() {} // trailing\n#[cfg(test)]\nfn b() {}\n",
        )
        .unwrap();

        let lines = production_lines(&dir);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].code, "fn a() {}");
        assert_eq!(lines[0].number, 2);
        fs::remove_dir_all(dir).unwrap();
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("arch-enforcement-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }
}
