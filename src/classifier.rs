//! Entry classification
//!
//! Turns a path produced by the walker into an [`Entry`] and runs the policy
//! catalog over it. Symlinks are resolved to their target: the entry takes
//! the target's path, kind and mode, and is never expanded into a subtree.

use crate::entry::{Entry, EntryKind};
use crate::error::{EntryError, EntryResult};
use crate::policy::{PolicyCatalog, Warning};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Classifies paths and evaluates them against a shared catalog
#[derive(Debug, Clone)]
pub struct Classifier {
    catalog: Arc<PolicyCatalog>,
}

impl Classifier {
    pub fn new(catalog: Arc<PolicyCatalog>) -> Self {
        Self { catalog }
    }

    /// Classify `path` and collect every warning the catalog raises for it
    pub fn inspect(&self, path: &Path) -> EntryResult<Inspection> {
        let entry = classify(path)?;
        let warnings = self.catalog.evaluate(&entry);
        Ok(Inspection { entry, warnings })
    }
}

/// A classified entry and the warnings raised for it, in catalog order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub entry: Entry,
    pub warnings: Vec<Warning>,
}

/// Resolve `path` to an entry, following a symlink one level
///
/// The existence check follows links, so a dangling symlink reports
/// `NotFound` just like an entry that vanished after enumeration.
pub fn classify(path: &Path) -> EntryResult<Entry> {
    let resolved = fs::metadata(path).map_err(|e| EntryError::from_io(path, &e))?;
    let own = fs::symlink_metadata(path).map_err(|e| EntryError::from_io(path, &e))?;

    if !own.file_type().is_symlink() {
        return Ok(Entry::new(
            path,
            EntryKind::from_file_type(own.file_type()),
            own.permissions().mode(),
        ));
    }

    let target = fs::read_link(path).map_err(|e| EntryError::from_readlink(path, &e))?;
    let target = link_target_path(path, &target);

    Ok(Entry::new(
        target,
        EntryKind::from_file_type(resolved.file_type()),
        resolved.permissions().mode(),
    )
    .via_link(path))
}

/// Absolute path a link at `link` with contents `target` points to
fn link_target_path(link: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        return normalize(target);
    }
    let base = link.parent().unwrap_or_else(|| Path::new("/"));
    normalize(&base.join(target))
}

/// Lexically drop `.` and fold `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
