//! hexpect golden file CLI
//!
//! Lints and formats golden files and checks them against recorded or live
//! responses.
//!
//! Usage:
//!   hexpect-lint lint <directory_or_file> [OPTIONS]
//!   hexpect-lint fmt <directory_or_file> [--check]
//!   hexpect-lint check <golden> (--response <file.json> | --url <URL>)

mod fetch;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hexpect::golden;
use hexpect::{ActualResponse, Failure};
use hexpect_lint::{
    collect_golden_files, format_file, lint_path, Config, FormatOutcome, LintIssue, LintOptions,
    LintResult, OutputFormat, RecordedResponse, Severity,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// hexpect golden file tool
#[derive(Parser, Debug)]
#[command(name = "hexpect-lint")]
#[command(author, version, about = "Lint, format and check hexpect golden files")]
struct Args {
    /// Config file (default: ./hexpect.yaml when present)
    #[arg(short, long, global = true, env = "HEXPECT_CONFIG")]
    config: Option<PathBuf>,

    /// Output format, overrides the config file
    #[arg(short, long, global = true, value_enum)]
    output: Option<OutputFormat>,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse golden files and report problems
    Lint {
        /// Golden file or directory of golden files
        path: PathBuf,

        /// Only show errors (hide warnings and notes)
        #[arg(short = 'e', long)]
        errors_only: bool,

        /// Treat warnings as errors
        #[arg(short, long)]
        strict: bool,

        /// Skip the canonical layout check
        #[arg(long)]
        no_layout: bool,
    },
    /// Rewrite golden files in canonical form
    Fmt {
        /// Golden file or directory of golden files
        path: PathBuf,

        /// Report files that would change without writing them
        #[arg(long)]
        check: bool,
    },
    /// Check one golden file against a response
    Check {
        /// Golden file describing the expected response
        golden: PathBuf,

        /// Recorded response as JSON: {"status", "headers", "body"}
        #[arg(short, long, conflicts_with = "url", required_unless_present = "url")]
        response: Option<PathBuf>,

        /// Fetch the response with a GET request
        #[arg(short, long)]
        url: Option<String>,

        /// Request timeout in seconds, overrides the config file
        #[arg(short, long)]
        timeout: Option<u64>,
    },
}

/// Effective settings after merging the config file with CLI flags.
#[derive(Debug, Clone)]
struct Settings {
    config: Config,
    palette: Palette,
}

impl Settings {
    fn resolve(args: &Args) -> Result<Self, anyhow::Error> {
        let cwd = std::env::current_dir().context("Failed to read the working directory")?;
        let mut config = Config::discover(args.config.as_deref(), &cwd)?;
        if let Some(output) = args.output {
            config.output = output;
        }
        if args.no_color {
            config.color = false;
        }
        let palette = Palette::new(config.color);
        Ok(Self { config, palette })
    }

    fn json(&self) -> bool {
        self.config.output == OutputFormat::Json
    }
}

/// ANSI codes, or empty strings when color is off.
#[derive(Debug, Clone, Copy)]
struct Palette {
    green: &'static str,
    red: &'static str,
    yellow: &'static str,
    cyan: &'static str,
    bold: &'static str,
    dim: &'static str,
    reset: &'static str,
}

impl Palette {
    fn new(enabled: bool) -> Self {
        if enabled {
            Self {
                green: "\x1b[32m",
                red: "\x1b[31m",
                yellow: "\x1b[33m",
                cyan: "\x1b[36m",
                bold: "\x1b[1m",
                dim: "\x1b[2m",
                reset: "\x1b[0m",
            }
        } else {
            Self {
                green: "",
                red: "",
                yellow: "",
                cyan: "",
                bold: "",
                dim: "",
                reset: "",
            }
        }
    }

    fn severity(&self, severity: Severity) -> &'static str {
        match severity {
            Severity::Error => self.red,
            Severity::Warning => self.yellow,
            Severity::Info => self.cyan,
        }
    }
}

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, anyhow::Error> {
    let settings = Settings::resolve(&args)?;
    tracing::debug!(config = ?settings.config, "resolved settings");

    match &args.command {
        Command::Lint {
            path,
            errors_only,
            strict,
            no_layout,
        } => {
            let options = LintOptions {
                extension: settings.config.extension.clone(),
                check_layout: !no_layout,
            };
            let strict = *strict || settings.config.strict;
            Ok(run_lint(path, &options, *errors_only, strict, &settings))
        }
        Command::Fmt { path, check } => run_fmt(path, *check, &settings),
        Command::Check {
            golden,
            response,
            url,
            timeout,
        } => {
            let actual = match (response, url) {
                (Some(file), _) => RecordedResponse::from_file(file)?.into_actual(),
                (None, Some(url)) => {
                    let client = fetch::client(timeout.unwrap_or(settings.config.timeout_secs))?;
                    fetch::fetch(&client, url).await?
                }
                (None, None) => anyhow::bail!("either --response or --url is required"),
            };
            run_check(golden, &actual, &settings)
        }
    }
}

// ============================================================================
// lint
// ============================================================================

fn run_lint(
    path: &Path,
    options: &LintOptions,
    errors_only: bool,
    strict: bool,
    settings: &Settings,
) -> ExitCode {
    let result = lint_path(path, options);

    if settings.json() {
        print_json(&result);
    } else {
        print_lint_results(path, &result, errors_only, settings.palette);
    }

    if result.is_failure(strict) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(output) => println!("{output}"),
        Err(e) => eprintln!("error: failed to encode JSON output: {e}"),
    }
}

fn print_lint_results(path: &Path, result: &LintResult, errors_only: bool, p: Palette) {
    let Palette {
        green,
        red,
        yellow,
        cyan,
        bold,
        dim,
        reset,
    } = p;

    println!("{bold}{cyan}hexpect golden file linter{reset}");
    println!("{dim}{RULE}{reset}");
    println!("{dim}Scanning:{reset} {cyan}{}{reset}", path.display());
    println!(
        "{dim}Found:{reset}    {bold}{}{reset} golden file(s)\n",
        result.files_checked
    );

    if result.issues.is_empty() {
        println!("{green}{bold}No issues found!{reset}");
    } else {
        let mut issues_by_file: BTreeMap<&PathBuf, Vec<&LintIssue>> = BTreeMap::new();
        for issue in &result.issues {
            if errors_only && issue.severity != Severity::Error {
                continue;
            }
            issues_by_file.entry(&issue.file).or_default().push(issue);
        }

        for (file, issues) in issues_by_file {
            let file_errors = issues
                .iter()
                .filter(|i| i.severity == Severity::Error)
                .count();
            let file_warnings = issues
                .iter()
                .filter(|i| i.severity == Severity::Warning)
                .count();

            let status_indicator = if file_errors > 0 {
                format!("{red}FAIL{reset}")
            } else if file_warnings > 0 {
                format!("{yellow}WARN{reset}")
            } else {
                format!("{cyan}NOTE{reset}")
            };
            println!("{status_indicator} {bold}{cyan}{}{reset}", file.display());

            for issue in issues {
                let color = p.severity(issue.severity);
                let line_str = issue
                    .line
                    .map(|l| format!("{dim}line {l}{reset} "))
                    .unwrap_or_default();
                let location_str = issue
                    .location
                    .as_ref()
                    .map(|l| format!("{dim}[{reset}{cyan}{l}{reset}{dim}]{reset} "))
                    .unwrap_or_default();

                println!(
                    "  {color}|{reset} {line_str}{location_str}{bold}{color}{}{reset}: {} {dim}({color}{}{dim}){reset}",
                    issue.severity.label(),
                    issue.message,
                    issue.code
                );
                if let Some(suggestion) = &issue.suggestion {
                    println!("  {color}|{reset}   {green}-> {suggestion}{reset}");
                }
            }
            println!();
        }
    }

    println!("{dim}{RULE}{reset}");
    println!("{bold}{cyan}Summary{reset}");
    println!("{dim}{RULE}{reset}");
    println!("  {dim}Files checked:{reset} {bold}{}{reset}", result.files_checked);
    if result.errors > 0 {
        println!("  {red}Errors:{reset}    {bold}{red}{}{reset}", result.errors);
    } else {
        println!("  {green}Errors:{reset}    {bold}{green}0{reset}");
    }
    if result.warnings > 0 {
        println!("  {yellow}Warnings:{reset}  {bold}{yellow}{}{reset}", result.warnings);
    } else {
        println!("  {dim}Warnings:{reset}  {bold}0{reset}");
    }
    println!();

    if result.errors == 0 && result.warnings == 0 {
        println!("{green}{bold}All checks passed!{reset}");
    } else if result.errors == 0 {
        println!("{yellow}{bold}Passed with warnings{reset}");
    } else {
        println!("{red}{bold}Linting failed with errors{reset}");
    }
}

// ============================================================================
// fmt
// ============================================================================

fn run_fmt(path: &Path, check: bool, settings: &Settings) -> Result<ExitCode, anyhow::Error> {
    let Palette {
        green,
        red,
        yellow,
        reset,
        ..
    } = settings.palette;

    let files = collect_golden_files(path, &settings.config.extension);
    if files.is_empty() {
        anyhow::bail!("no golden files found at {}", path.display());
    }

    let mut changed = Vec::new();
    let mut failed = 0usize;
    for file in &files {
        match format_file(file, check) {
            Ok(FormatOutcome::Unchanged) => {}
            Ok(FormatOutcome::Changed(_)) => {
                if !settings.json() {
                    let verb = if check { "would reformat" } else { "reformatted" };
                    println!("{yellow}{verb}{reset} {}", file.display());
                }
                changed.push(file.clone());
            }
            Err(e) => {
                failed += 1;
                eprintln!("{red}error:{reset} {e:#}");
            }
        }
    }

    if settings.json() {
        print_json(&serde_json::json!({
            "files_checked": files.len(),
            "changed": changed,
            "errors": failed,
            "check": check,
        }));
    } else {
        println!(
            "{green}{} file(s) checked, {} {}{reset}",
            files.len(),
            changed.len(),
            if check { "need formatting" } else { "reformatted" }
        );
    }

    let failure = failed > 0 || (check && !changed.is_empty());
    Ok(if failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

// ============================================================================
// check
// ============================================================================

fn run_check(
    golden_path: &Path,
    actual: &ActualResponse,
    settings: &Settings,
) -> Result<ExitCode, anyhow::Error> {
    let document = golden::load(golden_path)?;
    let failures = document.expectation().check(actual);

    if settings.json() {
        print_json(&serde_json::json!({
            "golden": golden_path,
            "passed": failures.is_empty(),
            "failures": failures,
        }));
    } else {
        print_failures(golden_path, &failures, settings.palette);
    }

    Ok(if failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_failures(golden_path: &Path, failures: &[Failure], p: Palette) {
    let Palette {
        green,
        red,
        cyan,
        bold,
        dim,
        reset,
        ..
    } = p;

    if failures.is_empty() {
        println!("{green}PASS{reset} {bold}{cyan}{}{reset}", golden_path.display());
        return;
    }

    println!(
        "{red}FAIL{reset} {bold}{cyan}{}{reset} {dim}({red}{} failure(s){reset}{dim}){reset}",
        golden_path.display(),
        failures.len()
    );
    for failure in failures {
        let path = failure.path_string();
        let path = if path.is_empty() { "<root>".to_string() } else { path };
        println!("  {red}|{reset} {dim}[{reset}{cyan}{path}{reset}{dim}]{reset} {}", failure.message());
    }
}
