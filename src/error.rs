//! Error types for permwalk
//!
//! This module defines the error hierarchy for:
//! - Session setup (home directory, configuration, worker threads)
//! - Entry inspection faults raised by the classifier
//! - Per-root scan errors reported as findings
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Only session setup errors are fatal; an entry fault ends its own root
//! - A directory that cannot be listed is not an error; its children are skipped
//! - Policy mismatches are warnings, never errors

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level error type for a scan session
#[derive(Error, Debug)]
pub enum AuditError {
    /// The home directory could not be resolved; no root is scanned
    #[error("home directory unavailable: {reason}")]
    HomeDirectoryUnavailable { reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker thread errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A root argument was the empty string
    #[error("Empty root path at position {index}")]
    EmptyRoot { index: usize },

    /// No roots given and the working directory is unknown
    #[error("Cannot determine current directory: {reason}")]
    CurrentDir { reason: String },

    /// Home override must be absolute
    #[error("Invalid home directory '{path}': {reason}")]
    InvalidHome { path: PathBuf, reason: String },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The OS refused to start a session thread
    #[error("Failed to spawn thread '{thread}': {reason}")]
    SpawnFailed { thread: String, reason: String },

    /// A root worker panicked
    #[error("Worker for '{}' panicked", .root.display())]
    Panicked { root: PathBuf },
}

/// Coarse classification of an entry fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    NotFound,
    AccessDenied,
    SymlinkResolution,
    Unreadable,
}

/// Fault raised while inspecting a single entry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// The entry vanished between enumeration and inspection
    #[error("{}: not found", .path.display())]
    NotFound { path: PathBuf },

    /// Metadata or directory listing refused
    #[error("{}: access denied", .path.display())]
    AccessDenied { path: PathBuf },

    /// The link itself could not be read
    #[error("{}: cannot resolve symlink: {reason}", .path.display())]
    SymlinkResolution { path: PathBuf, reason: String },

    /// Any other I/O failure
    #[error("{}: unreadable: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },
}

impl EntryError {
    /// Map an I/O error observed on `path` onto the fault taxonomy
    pub fn from_io(path: &Path, err: &io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::NotFound => EntryError::NotFound { path },
            io::ErrorKind::PermissionDenied => EntryError::AccessDenied { path },
            _ => EntryError::Unreadable {
                path,
                reason: err.to_string(),
            },
        }
    }

    /// Map a failed `read_link` onto the fault taxonomy
    pub fn from_readlink(path: &Path, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => EntryError::AccessDenied {
                path: path.to_path_buf(),
            },
            _ => EntryError::SymlinkResolution {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
        }
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            EntryError::NotFound { .. } => FaultKind::NotFound,
            EntryError::AccessDenied { .. } => FaultKind::AccessDenied,
            EntryError::SymlinkResolution { .. } => FaultKind::SymlinkResolution,
            EntryError::Unreadable { .. } => FaultKind::Unreadable,
        }
    }

    /// Returns the path the fault was observed on
    pub fn path(&self) -> &Path {
        match self {
            EntryError::NotFound { path }
            | EntryError::AccessDenied { path }
            | EntryError::SymlinkResolution { path, .. }
            | EntryError::Unreadable { path, .. } => path,
        }
    }
}

/// A traversal fault that ended one root's scan
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// An entry under `root` could not be inspected
    #[error("{fault}")]
    Entry { root: PathBuf, fault: EntryError },

    /// The root's worker terminated abnormally
    #[error("{}: scan aborted: {message}", .root.display())]
    Aborted { root: PathBuf, message: String },
}

impl ScanError {
    pub fn entry(root: &Path, fault: EntryError) -> Self {
        ScanError::Entry {
            root: root.to_path_buf(),
            fault,
        }
    }

    /// Returns the root whose traversal this error ended
    pub fn root(&self) -> &Path {
        match self {
            ScanError::Entry { root, .. } | ScanError::Aborted { root, .. } => root,
        }
    }

    /// Returns the path the error was observed on
    pub fn path(&self) -> &Path {
        match self {
            ScanError::Entry { fault, .. } => fault.path(),
            ScanError::Aborted { root, .. } => root,
        }
    }

    /// Fault kind, if the error came from an entry inspection
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            ScanError::Entry { fault, .. } => Some(fault.kind()),
            ScanError::Aborted { .. } => None,
        }
    }
}

/// Result type alias for AuditError
pub type Result<T> = std::result::Result<T, AuditError>;

/// Result type alias for EntryError
pub type EntryResult<T> = std::result::Result<T, EntryError>;
