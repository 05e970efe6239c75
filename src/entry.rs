//! Filesystem entry types
//!
//! An [`Entry`] is the classifier's view of one visited object, after
//! symlink resolution. Entries are created once per visit and dropped after
//! the catalog has been applied.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Permission bits considered by every rule (`0o1000 - 1`)
pub const MODE_MASK: u32 = 0o777;

/// Type of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Device, FIFO, socket or anything else
    Other,
}

impl EntryKind {
    /// Derive the kind from a metadata file type
    pub fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    /// Check if this is a regular file
    pub fn is_file(&self) -> bool {
        *self == EntryKind::File
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        *self == EntryKind::Directory
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Other => "special file",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single inspected filesystem object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path after symlink resolution
    pub path: PathBuf,

    /// Basename of `path`
    pub name: String,

    /// Kind of the resolved object
    pub kind: EntryKind,

    /// Lowest 9 permission bits of the resolved object
    pub mode: u32,

    /// The link path this entry was reached through, if any
    pub link: Option<PathBuf>,
}

impl Entry {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind, mode: u32) -> Self {
        let path = path.into();
        let name = basename(&path);
        Self {
            path,
            name,
            kind,
            mode: mode & MODE_MASK,
            link: None,
        }
    }

    /// Record the link this entry was resolved from
    pub fn via_link(mut self, link: impl Into<PathBuf>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Basename of the parent directory, if there is one
    pub fn parent_name(&self) -> Option<String> {
        self.path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Final component of `path` as a string; `/` yields an empty name
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
