// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap and set up logging
// 2. Check every file with the link checker library, printing each link as
//    soon as it has been checked
// 3. Print the problems (or JSON) for each file, then a summary
// 4. Exit with proper code (0 = all good, 1 = issues found, 2 = error)
//
// All the checking logic lives in the library (src/lib.rs). This file only
// decides how things look on the terminal.
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::debug;

use cli::Cli;
use link_warden::{
    decode_document, Bucket, CheckConfig, CheckReport, FailureKind, LinkChecker, ProgressEvent,
};

// How one file turned out
enum FileStatus {
    Clean,
    Issues,
    Failed(String),
}

// The #[tokio::main] attribute transforms our async main into a real main function
#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // If an unexpected error occurred, print it and exit with code 2
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_logging(verbose: u8) {
    // RUST_LOG wins; otherwise -v/-vv. Default to warn so progress output
    // isn't buried in log lines.
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Returns:
//   Ok(0) = no issues in any file
//   Ok(1) = at least one file has issues
//   Ok(2) = at least one file could not be checked
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!(?cli, "CLI arguments parsed");

    let files = cli.all_files();
    if files.is_empty() {
        anyhow::bail!("no files given (try --help)");
    }

    let config = cli.to_config();
    let checker = LinkChecker::new(config).context("cannot set up the link checker")?;

    let mut summary = Vec::with_capacity(files.len());
    for file in &files {
        let status = match check_file(&checker, file, cli.json).await {
            Ok(true) => FileStatus::Clean,
            Ok(false) => FileStatus::Issues,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                FileStatus::Failed(format!("{:#}", e))
            }
        };
        summary.push((file.display().to_string(), status));
    }

    if summary.len() > 1 && !cli.json {
        print_summary(&summary);
    }

    let code = summary
        .iter()
        .map(|(_, status)| match status {
            FileStatus::Clean => 0,
            FileStatus::Issues => 1,
            FileStatus::Failed(_) => 2,
        })
        .max()
        .unwrap_or(0);
    Ok(code)
}

// Checks one file. Ok(true) means no issues.
async fn check_file(checker: &LinkChecker, path: &Path, json: bool) -> Result<bool> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let text = decode_document(&bytes);
    let config = checker.config();

    if !json {
        println!("> Checking links in {}", path.display());
        println!("{}", describe_options(config));
    }

    let report = checker
        .check(&text, |event| {
            if !json {
                println!("{}", format_event(event));
            }
        })
        .await
        .with_context(|| format!("cannot check {}", path.display()))?;

    let success = report.success(config);

    if json {
        let output = serde_json::json!({
            "file": path.display().to_string(),
            "success": success,
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(success);
    }

    print_report(&report, config);
    if success {
        println!("No issues :-)");
    } else {
        println!("\nIssues :-(");
    }
    Ok(success)
}

// One line listing the active options, e.g. "> Will allow duplicate links"
fn describe_options(config: &CheckConfig) -> String {
    let mut parts = Vec::new();
    if !config.allowed_status_codes.is_empty() {
        let codes: Vec<String> = config.allowed_status_codes.iter().map(|c| c.to_string()).collect();
        parts.push(format!("errors {}", codes.join(", ")));
    }
    if config.allow_dupe {
        parts.push("duplicate links".to_string());
    }
    if config.allow_redirect {
        parts.push("redirects".to_string());
    }
    if config.allow_ssl {
        parts.push("SSL errors".to_string());
    }
    if config.allow_timeout {
        parts.push("timeouts".to_string());
    }

    let mut lines = Vec::new();
    if !parts.is_empty() {
        lines.push(format!("> Will allow {}", parts.join(", ")));
    }
    if let Some(base) = &config.base_url {
        lines.push(format!("> Resolving relative links against {}", base));
    }
    if let Some(delay) = config.request_delay {
        lines.push(format!("> Waiting {}s between requests", delay));
    }
    lines.push(format!("> Timeout: {}s", config.probe_timeout().as_secs()));
    if !config.white_list.is_empty() {
        lines.push(format!("> White list: {}", config.white_list.join(", ")));
    }
    lines.join("\n")
}

fn format_event(event: &ProgressEvent) -> String {
    let status = match event.outcome.status_code {
        Some(code) => code.to_string(),
        None => "---".to_string(),
    };
    format!(
        "  [{}/{}] {} {} {}",
        event.completed,
        event.total,
        format_bucket(event.bucket),
        status,
        event.url
    )
}

// Formats the bucket as a short marker
fn format_bucket(bucket: Bucket) -> &'static str {
    match bucket {
        Bucket::Ok => "✅",
        Bucket::Errors => "❌",
        Bucket::SslErrors => "🔒",
        Bucket::Timeouts => "⏱️ ",
        Bucket::Redirects => "🔀",
        Bucket::WhiteListed => "⚪",
        Bucket::Duplicates => "🔁",
    }
}

// Prints every non-OK bucket, each entry with the lines it appears on
fn print_report(report: &CheckReport, config: &CheckConfig) {
    let sections = [
        (Bucket::WhiteListed, true),
        (Bucket::Errors, false),
        (Bucket::SslErrors, config.allow_ssl),
        (Bucket::Timeouts, config.allow_timeout),
        (Bucket::Redirects, config.allow_redirect),
        (Bucket::Duplicates, config.allow_dupe),
    ];

    for (bucket, allowed) in sections {
        let mut entries: Vec<_> = report.bucket(bucket).iter().collect();
        if entries.is_empty() {
            continue;
        }
        // Order by where the URL first appears
        entries.sort_by_key(|e| e.occurrences.first().map(|o| o.location));

        let note = if allowed && bucket != Bucket::WhiteListed {
            " (allowed)"
        } else {
            ""
        };
        println!("\n> {}{}:", bucket.label(), note);

        for (i, entry) in entries.iter().enumerate() {
            let lines: Vec<String> = entry
                .occurrences
                .iter()
                .map(|o| format!("L{:03}", o.location.line))
                .collect();
            let detail = entry
                .outcome
                .as_ref()
                .map(|o| match (&o.final_url, o.failure) {
                    (Some(target), _) => format!("-> {}", target),
                    (None, FailureKind::None) => String::new(),
                    (None, _) => o.message.clone().unwrap_or_default(),
                })
                .unwrap_or_default();
            println!(
                "{:4}. {} {} {}",
                i + 1,
                lines.join(", "),
                entry.url,
                detail
            );
        }
    }

    if !report.diagnostics.is_empty() {
        println!("\n> Markdown syntax:");
        for diagnostic in &report.diagnostics {
            println!(
                "  L{:03}:{} {:?} `{}`",
                diagnostic.location.line,
                diagnostic.location.column,
                diagnostic.issue,
                diagnostic.snippet
            );
        }
    }
}

fn print_summary(summary: &[(String, FileStatus)]) {
    println!("\nSummary");
    let width = summary.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, status) in summary {
        let text = match status {
            FileStatus::Clean => "OK".to_string(),
            FileStatus::Issues => "Issues".to_string(),
            FileStatus::Failed(reason) => format!("Error: {}", reason),
        };
        println!("{:>width$}: {}", name, text, width = width);
    }
}
