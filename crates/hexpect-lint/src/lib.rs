//! Golden file tooling for hexpect.
//!
//! This library lints and formats golden files and loads recorded responses
//! to check them against. It backs the `hexpect-lint` CLI binary but can be
//! used on its own.
//!
//! # Example
//!
//! ```no_run
//! use hexpect_lint::{lint_path, LintOptions};
//! use std::path::Path;
//!
//! let result = lint_path(Path::new("./golden"), &LintOptions::default());
//! if result.has_errors() {
//!     eprintln!("Found {} errors", result.errors);
//! }
//! ```

pub mod config;
mod recorded;
mod rules;
mod types;

use anyhow::Context;
use hexpect::golden::{self, GoldenDocument, ParseError};
use std::path::{Path, PathBuf};
use tracing::debug;

pub use config::{Config, OutputFormat};
pub use recorded::{HeaderValues, RecordedResponse};
pub use rules::{
    is_canonical, validate_body, validate_document, validate_headers, validate_layout,
    validate_status,
};
pub use types::{LintIssue, LintOptions, LintResult, Severity};

/// Golden files under `path`: the file itself, or the files of a directory
/// (non-recursive) carrying `extension`, sorted.
pub fn collect_golden_files(path: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if path.is_file() {
        files.push(path.to_path_buf());
    } else if path.is_dir() {
        if let Ok(entries) = std::fs::read_dir(path) {
            for entry in entries.flatten() {
                let entry_path = entry.path();
                if entry_path.is_file() && entry_path.extension().is_some_and(|ext| ext == extension) {
                    files.push(entry_path);
                }
            }
        }
    }

    files.sort();
    files
}

/// Lint a single golden file.
pub fn lint_file(path: &Path, options: &LintOptions) -> LintResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            let mut result = LintResult::new();
            result.files_checked = 1;
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read file: {e}"),
                path.to_path_buf(),
            ));
            return result;
        }
    };

    lint_source(&content, path, options)
}

/// Lint every golden file in a directory (non-recursive).
pub fn lint_directory(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();

    if let Err(e) = std::fs::read_dir(path) {
        result.add_issue(LintIssue::error(
            "E001",
            format!("Failed to read directory: {e}"),
            path.to_path_buf(),
        ));
        return result;
    }

    for file in collect_golden_files(path, &options.extension) {
        result.merge(lint_file(&file, options));
    }

    result
}

/// Lint a file or a directory.
pub fn lint_path(path: &Path, options: &LintOptions) -> LintResult {
    if path.is_dir() {
        lint_directory(path, options)
    } else {
        lint_file(path, options)
    }
}

/// Lint golden file text directly, reporting it as `source_name`.
pub fn lint_str(text: &str, source_name: &str, options: &LintOptions) -> LintResult {
    lint_source(text, Path::new(source_name), options)
}

fn lint_source(text: &str, path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;

    match golden::parse(text) {
        Ok(document) => validate_document(path, text, &document, options, &mut result),
        Err(e) => result.add_issue(parse_issue(path, &e)),
    }

    debug!(
        file = %path.display(),
        errors = result.errors,
        warnings = result.warnings,
        "linted golden file"
    );
    result
}

fn parse_issue(path: &Path, error: &ParseError) -> LintIssue {
    LintIssue::error("E002", error.kind.to_string(), path.to_path_buf())
        .with_line(error.line)
        .with_suggestion("See the golden file format in the hexpect documentation")
}

/// Outcome of formatting one file.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatOutcome {
    /// Already canonical.
    Unchanged,
    /// Needs rewriting; holds the canonical text.
    Changed(String),
}

fn format_document(text: &str, document: &GoldenDocument) -> FormatOutcome {
    if is_canonical(text, document) {
        FormatOutcome::Unchanged
    } else {
        FormatOutcome::Changed(document.to_string())
    }
}

/// Canonical serialization of golden file text.
pub fn format_str(text: &str) -> Result<FormatOutcome, ParseError> {
    let document = golden::parse(text)?;
    Ok(format_document(text, &document))
}

/// Format a golden file, rewriting it in place unless `check_only`.
pub fn format_file(path: &Path, check_only: bool) -> Result<FormatOutcome, anyhow::Error> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document = golden::parse_named(path, &text)?;
    let outcome = format_document(&text, &document);

    if let FormatOutcome::Changed(canonical) = &outcome {
        if !check_only {
            std::fs::write(path, canonical)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            debug!(file = %path.display(), "rewrote golden file");
        }
    }
    Ok(outcome)
}
