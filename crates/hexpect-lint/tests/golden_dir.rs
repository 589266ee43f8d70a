//! Linting, formatting and checking a directory of golden files on disk.

use hexpect_lint::{
    collect_golden_files, format_file, lint_directory, lint_file, lint_path, FormatOutcome,
    LintOptions, RecordedResponse, Severity,
};
use std::fs;
use std::path::Path;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_lint_directory_mixed_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ok.golden", "200\n--- body json\n{\n  \"id\": 1\n}\n");
    write(dir.path(), "broken.golden", "200\n--- headers\nno colon\n");
    write(dir.path(), "odd.golden", "999\n");
    write(dir.path(), "notes.txt", "not a golden file");

    let result = lint_directory(dir.path(), &LintOptions::default());
    assert_eq!(result.files_checked, 3);
    assert_eq!(result.errors, 1);
    assert_eq!(result.warnings, 1);

    let broken = result
        .issues
        .iter()
        .find(|i| i.severity == Severity::Error)
        .unwrap();
    assert_eq!(broken.code, "E002");
    assert_eq!(broken.line, Some(3));
    assert!(broken.file.ends_with("broken.golden"));
    assert_eq!(broken.message, r#"invalid header line "no colon""#);

    assert!(result.is_failure(false));
}

#[test]
fn test_custom_extension() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.resp", "200\n");
    write(dir.path(), "b.golden", "200\n");

    let options = LintOptions {
        extension: "resp".to_string(),
        ..LintOptions::default()
    };
    let files = collect_golden_files(dir.path(), &options.extension);
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("a.resp"));
    assert_eq!(lint_path(dir.path(), &options).files_checked, 1);
}

#[test]
fn test_missing_paths() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.golden");

    let result = lint_file(&missing, &LintOptions::default());
    assert_eq!(result.issues[0].code, "E001");

    let result = lint_directory(&dir.path().join("nodir"), &LintOptions::default());
    assert_eq!(result.issues[0].code, "E001");
}

#[test]
fn test_format_rewrites_and_check_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("messy.golden");
    let messy = "\n201\n--- HEADERS\nLocation:/users/1\n--- body JSON\n{\"id\":1}\n\n";
    fs::write(&path, messy).unwrap();

    let outcome = format_file(&path, true).unwrap();
    assert!(matches!(outcome, FormatOutcome::Changed(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), messy);

    format_file(&path, false).unwrap();
    let canonical = fs::read_to_string(&path).unwrap();
    assert_eq!(
        canonical,
        "201\n--- headers\nLocation: /users/1\n--- body json\n{\n  \"id\": 1\n}\n"
    );
    assert_eq!(format_file(&path, true).unwrap(), FormatOutcome::Unchanged);

    let result = lint_file(&path, &LintOptions::default());
    assert!(result.issues.is_empty());
}

#[test]
fn test_format_reports_parse_errors_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.golden");
    fs::write(&path, "oops\n").unwrap();

    let err = format_file(&path, false).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("bad.golden"));
    assert!(message.ends_with(r#"invalid status "oops""#));
}

#[test]
fn test_recorded_response_against_golden() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "user.golden",
        "200\n--- headers\nContent-Type: application/json\n--- body json\n{\"id\": 7, \"name\": \"ada\"}\n",
    );
    write(
        dir.path(),
        "user.json",
        r#"{"status": 200, "headers": {"content-type": "application/json"}, "body": {"id": 7, "name": "bob", "extra": 1}}"#,
    );

    let document = hexpect::golden::load(dir.path().join("user.golden")).unwrap();
    let actual = RecordedResponse::from_file(dir.path().join("user.json"))
        .unwrap()
        .into_actual();
    let failures = document.expectation().check(&actual);

    let messages: Vec<String> = failures.iter().map(ToString::to_string).collect();
    assert_eq!(messages, vec![r#"body.name: expected "ada", got "bob""#]);
}

#[test]
fn test_recorded_response_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "bad.json", "{\"status\": \"ok\"}");

    let err = RecordedResponse::from_file(dir.path().join("bad.json")).unwrap_err();
    assert!(err.to_string().contains("bad.json"));
}
