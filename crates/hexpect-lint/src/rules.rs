//! Checks applied to a golden file that parsed successfully.
//!
//! Codes:
//! - `W001` status outside the HTTP range
//! - `W002` `--- headers exact` with no headers listed
//! - `W003` text body that looks like JSON
//! - `W004` the same header line listed twice
//! - `I001` file is not in canonical form

use crate::types::{LintIssue, LintOptions, LintResult};
use hexpect::golden::{GoldenBody, GoldenDocument};
use hexpect::response::decode_body;
use serde_json::Value;
use std::path::Path;

/// Run every rule against a parsed document. `text` is the file content it
/// was parsed from.
pub fn validate_document(
    path: &Path,
    text: &str,
    document: &GoldenDocument,
    options: &LintOptions,
    result: &mut LintResult,
) {
    validate_status(path, document, result);
    validate_headers(path, document, result);
    validate_body(path, document, result);
    if options.check_layout {
        validate_layout(path, text, document, result);
    }
}

pub fn validate_status(path: &Path, document: &GoldenDocument, result: &mut LintResult) {
    if !(100..=599).contains(&document.status) {
        result.add_issue(
            LintIssue::warning(
                "W001",
                format!("Status {} is outside the HTTP range 100-599", document.status),
                path.to_path_buf(),
            )
            .with_location("status"),
        );
    }
}

pub fn validate_headers(path: &Path, document: &GoldenDocument, result: &mut LintResult) {
    let Some(headers) = &document.headers else {
        return;
    };

    if document.headers_exact && headers.is_empty() {
        result.add_issue(
            LintIssue::warning(
                "W002",
                "Exact header block is empty, so any response header fails the check",
                path.to_path_buf(),
            )
            .with_location("headers")
            .with_suggestion("List the expected headers or drop 'exact'"),
        );
    }

    for (name, values) in headers.iter() {
        for (index, value) in values.iter().enumerate() {
            if values[..index].contains(value) {
                result.add_issue(
                    LintIssue::warning(
                        "W004",
                        format!("Header '{name}: {value}' is listed more than once"),
                        path.to_path_buf(),
                    )
                    .with_location(format!("headers.{}", name.to_ascii_lowercase()))
                    .with_suggestion("Repeated lines expect the header to be sent repeatedly"),
                );
            }
        }
    }
}

pub fn validate_body(path: &Path, document: &GoldenDocument, result: &mut LintResult) {
    if let Some(GoldenBody::Text(text)) = &document.body {
        if matches!(
            decode_body(text.as_bytes()),
            Some(Value::Object(_) | Value::Array(_))
        ) {
            result.add_issue(
                LintIssue::warning(
                    "W003",
                    "Body is valid JSON but is compared as literal text",
                    path.to_path_buf(),
                )
                .with_location("body")
                .with_suggestion("Use '--- body json' to compare it structurally"),
            );
        }
    }
}

pub fn validate_layout(path: &Path, text: &str, document: &GoldenDocument, result: &mut LintResult) {
    if !is_canonical(text, document) {
        result.add_issue(
            LintIssue::info("I001", "File is not in canonical form", path.to_path_buf())
                .with_suggestion("Run 'hexpect-lint fmt' to rewrite it"),
        );
    }
}

/// Whether `text` is exactly the canonical serialization of `document`.
pub fn is_canonical(text: &str, document: &GoldenDocument) -> bool {
    document.to_string() == text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;
    use hexpect::golden::parse;

    fn run(text: &str) -> LintResult {
        let document = parse(text).unwrap();
        let mut result = LintResult::new();
        validate_document(
            Path::new("t.golden"),
            text,
            &document,
            &LintOptions::default(),
            &mut result,
        );
        result
    }

    fn codes(result: &LintResult) -> Vec<&str> {
        result.issues.iter().map(|i| i.code.as_str()).collect()
    }

    #[test]
    fn test_clean_canonical_file() {
        let result = run("200\n--- headers\nContent-Type: text/plain\n--- body\nok\n");
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_status_range() {
        assert_eq!(codes(&run("700\n")), vec!["W001"]);
        assert_eq!(codes(&run("42\n")), vec!["W001"]);
        assert!(codes(&run("599\n")).is_empty());
    }

    #[test]
    fn test_empty_exact_headers() {
        let result = run("200\n--- headers exact\n");
        assert_eq!(codes(&result), vec!["W002"]);
        assert_eq!(result.issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_json_looking_text_body() {
        assert_eq!(codes(&run("200\n--- body\n{\"id\": 1}\n")), vec!["W003"]);
        assert!(codes(&run("200\n--- body\n42\n")).is_empty());
    }

    #[test]
    fn test_repeated_header_line() {
        let result = run("200\n--- headers\nVary: a\nVary: a\n");
        assert_eq!(codes(&result), vec!["W004"]);
        assert_eq!(result.issues[0].location.as_deref(), Some("headers.vary"));
    }

    #[test]
    fn test_non_canonical_layout_is_info() {
        let result = run("\n200\n--- HEADERS\nA:1\n");
        assert_eq!(codes(&result), vec!["I001"]);
        assert_eq!(result.warnings, 0);
        assert!(!result.is_failure(true));
    }

    #[test]
    fn test_layout_check_can_be_disabled() {
        let text = "\n200\n";
        let document = parse(text).unwrap();
        let options = LintOptions {
            check_layout: false,
            ..LintOptions::default()
        };
        let mut result = LintResult::new();
        validate_document(Path::new("t.golden"), text, &document, &options, &mut result);
        assert!(result.issues.is_empty());
    }
}
