//! Configuration types for permwalk
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::ConfigError;
use clap::Parser;
use std::path::PathBuf;

/// Audit SSH trust material for permission discrepancies
#[derive(Parser, Debug, Clone)]
#[command(
    name = "permwalk",
    version,
    about = "Audit SSH trust material for permission discrepancies",
    long_about = "Walks one or more directory trees and checks home directories, .ssh,\n\
                  key files, authorized_keys, known_hosts and /etc/ssh against a fixed\n\
                  permission policy. Each root is scanned on its own thread.\n\n\
                  Exits 0 when no warnings or errors were found, 1 otherwise.",
    after_help = "EXAMPLES:\n    \
        permwalk                      # scan the current directory\n    \
        permwalk ~ /etc/ssh -p        # scan two roots with progress\n    \
        permwalk --list-rules         # print the policy"
)]
pub struct CliArgs {
    /// Paths to scan (defaults to the current directory)
    #[arg(value_name = "ROOT")]
    pub roots: Vec<PathBuf>,

    /// Verbose output (log every scanned path)
    #[arg(short = 'v', long, visible_alias = "debug")]
    pub verbose: bool,

    /// Show a progress spinner and a summary
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Home directory used by the home-dir rule (defaults to the current user's)
    #[arg(long, value_name = "PATH")]
    pub home: Option<PathBuf>,

    /// Print the permission policy and exit
    #[arg(long)]
    pub list_rules: bool,
}

/// Validated runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Roots to scan, one worker each
    pub roots: Vec<PathBuf>,

    /// Home directory override
    pub home: Option<PathBuf>,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl ScanConfig {
    /// Configuration for library callers: scan `roots` with defaults
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            home: None,
            show_progress: false,
            verbose: false,
        }
    }

    /// Use `home` instead of resolving the current user's home directory
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if let Some(index) = args.roots.iter().position(|r| r.as_os_str().is_empty()) {
            return Err(ConfigError::EmptyRoot { index });
        }

        let roots = if args.roots.is_empty() {
            let cwd = std::env::current_dir().map_err(|e| ConfigError::CurrentDir {
                reason: e.to_string(),
            })?;
            vec![cwd]
        } else {
            args.roots
        };

        if let Some(home) = &args.home {
            if !home.is_absolute() {
                return Err(ConfigError::InvalidHome {
                    path: home.clone(),
                    reason: "must be an absolute path".to_string(),
                });
            }
        }

        Ok(Self {
            roots,
            home: args.home,
            show_progress: args.progress,
            verbose: args.verbose,
        })
    }
}
