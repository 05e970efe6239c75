//! permwalk - SSH permission-mode auditor
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use permwalk::config::{CliArgs, ScanConfig};
use permwalk::progress::{print_header, print_rules, print_summary, ProgressReporter};
use permwalk::walker::{ScanReport, ScanSession, SessionEvent};
use permwalk::PolicyCatalog;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// How often the spinner is refreshed while waiting for findings
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the scan came back clean
fn run() -> Result<bool> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    if args.list_rules {
        let home = match &args.home {
            Some(home) => home.clone(),
            None => dirs::home_dir().unwrap_or_else(|| PathBuf::from("~")),
        };
        print_rules(&PolicyCatalog::standard(&home));
        return Ok(true);
    }

    // Validate and create config
    let config = ScanConfig::from_args(args).context("Invalid configuration")?;

    if config.show_progress {
        print_header(&config.roots, config.home.as_deref());
    }

    let session = ScanSession::start(&config).context("Failed to start scan")?;

    let report = if config.show_progress {
        stream_with_progress(session)
    } else {
        stream(session)
    };

    if config.show_progress {
        print_summary(&report);
    }

    if !report.errors.is_empty() {
        info!(errors = report.errors.len(), "Scan completed with errors");
    }

    Ok(report.is_clean())
}

/// Print findings as they arrive
///
/// Events consumed here are no longer seen by `wait`, so the report's
/// findings are filled in from what was printed.
fn stream(mut session: ScanSession) -> ScanReport {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    while let Some(event) = session.recv() {
        match event {
            SessionEvent::Warning(w) => {
                println!("{}", w);
                warnings.push(w);
            }
            SessionEvent::Error(e) => {
                eprintln!("error: {}", e);
                errors.push(e);
            }
            SessionEvent::Completed => break,
        }
    }

    let mut report = session.wait();
    report.warnings = warnings;
    report.errors = errors;
    report
}

/// Print findings as they arrive while keeping a spinner alive
fn stream_with_progress(mut session: ScanSession) -> ScanReport {
    let progress = ProgressReporter::new();
    progress.set_status("Scanning...");

    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    while !session.is_completed() {
        match session.recv_timeout(PROGRESS_INTERVAL) {
            Some(SessionEvent::Warning(w)) => {
                progress.println(&w.message);
                warnings.push(w);
            }
            Some(SessionEvent::Error(e)) => {
                progress.eprintln(&format!("error: {}", e));
                errors.push(e);
            }
            Some(SessionEvent::Completed) | None => {}
        }
        progress.update(&session.progress());
    }

    let mut report = session.wait();
    report.warnings = warnings;
    report.errors = errors;

    progress.finish(&format!(
        "Scan completed: {} warnings, {} errors",
        report.warnings.len(),
        report.errors.len()
    ));

    report
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("permwalk=debug,warn")
    } else {
        EnvFilter::new("permwalk=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
