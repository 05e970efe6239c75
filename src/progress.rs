//! Progress reporting for the permission scanner
//!
//! Provides a live spinner using indicatif and console-styled header,
//! summary and rule listing. Everything here writes to stderr, except the
//! rule listing, so that stdout carries only warning lines during a scan.

use crate::policy::{PolicyCatalog, Target};
use crate::walker::{ScanProgress, ScanReport};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Progress reporter that displays scan status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &ScanProgress) {
        self.bar.set_message(progress_message(progress));
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Print a line to stdout without tearing the spinner
    pub fn println(&self, line: &str) {
        self.bar.suspend(|| println!("{}", line));
    }

    /// Print a line to stderr without tearing the spinner
    pub fn eprintln(&self, line: &str) {
        self.bar.suspend(|| eprintln!("{}", line));
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn progress_message(progress: &ScanProgress) -> String {
    format!(
        "Entries: {} | Dirs: {} | Warnings: {} | Errors: {} | Rate: {:.0}/s | Roots: {}/{}",
        format_number(progress.entries_scanned),
        format_number(progress.directories),
        format_number(progress.warnings),
        format_number(progress.errors),
        progress.entries_per_second(),
        progress.roots_finished,
        progress.roots,
    )
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the scan results
pub fn print_summary(report: &ScanReport) {
    let duration_secs = report.duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        report.entries_scanned as f64 / duration_secs
    } else {
        0.0
    };

    let title = if report.is_clean() {
        style("Scan Clean").green().bold()
    } else {
        style("Scan Complete").yellow().bold()
    };

    eprintln!();
    eprintln!("{}", title);
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Roots:").bold(), report.roots);
    eprintln!(
        "  {} {}",
        style("Entries:").bold(),
        format_number(report.entries_scanned)
    );
    eprintln!(
        "  {} {:.1}s ({:.0} entries/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if report.dirs_skipped > 0 {
        eprintln!(
            "  {} {}",
            style("Unlisted dirs:").yellow().bold(),
            format_number(report.dirs_skipped)
        );
    }
    if !report.warnings.is_empty() {
        eprintln!(
            "  {} {}",
            style("Warnings:").yellow().bold(),
            format_number(report.warnings.len() as u64)
        );
    }
    if !report.errors.is_empty() {
        eprintln!(
            "  {} {}",
            style("Errors:").red().bold(),
            format_number(report.errors.len() as u64)
        );
    }
    eprintln!();
}

/// Print a header at the start of the scan
pub fn print_header(roots: &[PathBuf], home: Option<&Path>) {
    eprintln!();
    eprintln!(
        "{} {}",
        style("permwalk").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", style("─".repeat(50)).dim());
    for root in roots {
        eprintln!("  {} {}", style("Root:").bold(), root.display());
    }
    match home {
        Some(home) => eprintln!("  {} {}", style("Home:").bold(), home.display()),
        None => eprintln!("  {} {}", style("Home:").bold(), style("(current user)").dim()),
    }
    eprintln!();
}

/// Print the catalog, one rule per line
pub fn print_rules(catalog: &PolicyCatalog) {
    for line in rule_lines(catalog) {
        println!("{}", line);
    }
}

fn rule_lines(catalog: &PolicyCatalog) -> Vec<String> {
    catalog
        .rules()
        .iter()
        .map(|rule| {
            format!(
                "{:<16} {:<28} {:<10} {}",
                rule.id,
                describe_target(rule.matcher.target()),
                rule.expected_mode.to_string(),
                rule.description
            )
        })
        .collect()
}

fn describe_target(target: &Target) -> String {
    match target {
        Target::Path(path) => path.display().to_string(),
        Target::Name(name) => name.clone(),
        Target::Pattern { include, .. } => format!("/{}/", include.as_str()),
        Target::Kind(kind) => format!("any {}", kind),
    }
}
