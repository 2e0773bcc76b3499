//! Golden test utilities for payload verification.
//!
//! Compares rendered payloads against checked-in golden files. Set
//! `UPDATE_GOLDEN` to rewrite the files instead of comparing.

use odelta_codec::from_json;
use std::fs;
use std::path::{Path, PathBuf};

/// A golden test that compares output against expected files.
#[derive(Debug)]
pub struct GoldenTest {
    name: String,
    golden_dir: PathBuf,
    update_mode: bool,
}

impl GoldenTest {
    /// Creates a new golden test.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the test (used for file naming)
    /// * `golden_dir` - Directory containing golden files
    pub fn new(name: impl Into<String>, golden_dir: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            golden_dir: golden_dir.as_ref().to_path_buf(),
            update_mode: std::env::var("UPDATE_GOLDEN").is_ok(),
        }
    }

    /// Creates a golden test using this crate's `tests/golden` directory.
    pub fn with_default_dir(name: impl Into<String>) -> Self {
        let golden_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("golden");
        Self::new(name, golden_dir)
    }

    /// Asserts that `actual` matches the golden file.
    ///
    /// JSON golden files may be pretty-printed; both sides are compared
    /// as parsed JSON, in member order, when the suffix is `json`.
    pub fn assert_text(&self, suffix: &str, actual: &str) {
        let path = self.file_path(suffix);

        if self.update_mode {
            self.update_golden_file(&path, actual.as_bytes());
            return;
        }

        if !path.exists() {
            panic!(
                "Golden file not found: {:?}\n\
                 Run with UPDATE_GOLDEN=1 to create it.\n\
                 Actual:\n{}",
                path, actual
            );
        }

        let expected = fs::read_to_string(&path).expect("Failed to read golden file");
        let matches = if suffix == "json" {
            same_json(&expected, actual)
        } else {
            normalize_line_endings(&expected) == normalize_line_endings(actual)
        };

        if !matches {
            panic!(
                "Golden test '{}' failed for '{}':\n\
                 --- Expected ---\n{}\n\
                 --- Actual ---\n{}\n\
                 Run with UPDATE_GOLDEN=1 to update.",
                self.name, suffix, expected, actual
            );
        }
    }

    fn file_path(&self, suffix: &str) -> PathBuf {
        let filename = if suffix.is_empty() {
            format!("{}.golden", self.name)
        } else {
            format!("{}.{}.golden", self.name, suffix)
        };
        self.golden_dir.join(filename)
    }

    fn update_golden_file(&self, path: &Path, data: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create golden directory");
        }
        fs::write(path, data).expect("Failed to write golden file");
        println!("Updated golden file: {:?}", path);
    }
}

/// Compares two JSON texts structurally, ignoring whitespace.
///
/// Member order and repeated members are significant.
pub fn same_json(expected: &str, actual: &str) -> bool {
    match (from_json(expected), from_json(actual)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Rewrites CRLF as LF, so golden files survive checkout conversions.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_comparison_ignores_whitespace() {
        assert!(same_json("{\n  \"a\": 1,\n  \"b\": [true]\n}", r#"{"a":1,"b":[true]}"#));
        assert!(!same_json(r#"{"a":1}"#, r#"{"a":2}"#));
        assert!(!same_json("not json", "{}"));
    }

    #[test]
    fn json_comparison_respects_member_order() {
        assert!(!same_json(r#"{"@removed":{},"@id":"x"}"#, r#"{"@id":"x","@removed":{}}"#));
        assert!(!same_json(r#"{"a":1,"a":1}"#, r#"{"a":1}"#));
        assert!(same_json(r#"{ "@removed": {}, "@id": "x" }"#, r#"{"@removed":{},"@id":"x"}"#));
    }

    #[test]
    fn line_endings_are_normalized() {
        assert_eq!(normalize_line_endings("a\r\nb\n"), "a\nb\n");
    }
}
