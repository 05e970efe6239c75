//! Single-root traversal
//!
//! [`RootWalker`] visits every object under one root exactly once, in
//! pre-order with directory entries sorted by name. Each path is classified
//! and evaluated before its children are listed. Symlinks are evaluated
//! through their target and never descended into.
//!
//! The first classification fault ends the traversal of this root and is
//! delivered as its single [`ScanError`]. A directory that classifies fine
//! but cannot be listed keeps its own warnings; only its children are
//! skipped.

use crate::classifier::{Classifier, Inspection};
use crate::error::{EntryError, EntryResult, ScanError};
use crate::walker::sink::{Finding, FindingSink};
use crate::walker::worker::WorkerStats;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// How a root traversal ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootOutcome {
    /// Every entry under the root was inspected
    Completed { entries: u64 },

    /// A fault ended the traversal; the error was delivered to the sink
    Failed { entries: u64, error: ScanError },

    /// The sink went away or the session shut down before the traversal finished
    Detached { entries: u64 },
}

impl RootOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RootOutcome::Completed { .. })
    }

    /// Entries inspected before the traversal ended
    pub fn entries(&self) -> u64 {
        match self {
            RootOutcome::Completed { entries }
            | RootOutcome::Failed { entries, .. }
            | RootOutcome::Detached { entries } => *entries,
        }
    }
}

/// Pre-order walker over a single root
pub struct RootWalker<'a> {
    root: PathBuf,
    classifier: &'a Classifier,
    stats: Option<Arc<WorkerStats>>,
    shutdown: Option<Arc<AtomicBool>>,
}

impl<'a> RootWalker<'a> {
    pub fn new(root: impl Into<PathBuf>, classifier: &'a Classifier) -> Self {
        Self {
            root: root.into(),
            classifier,
            stats: None,
            shutdown: None,
        }
    }

    /// Record progress into shared counters
    pub fn with_stats(mut self, stats: Arc<WorkerStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Stop quietly before the next entry once `flag` is set
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Walk the root, delivering every finding into `sink`
    pub fn run<S: FindingSink>(&self, sink: &mut S) -> RootOutcome {
        let mut entries = 0u64;

        let error = match self.traverse(sink, &mut entries) {
            Ok(true) => return RootOutcome::Completed { entries },
            Ok(false) => return RootOutcome::Detached { entries },
            Err(fault) => ScanError::entry(&self.root, fault),
        };

        debug!(root = %self.root.display(), "root aborted: {}", error);
        if let Some(stats) = &self.stats {
            stats.record_error();
        }

        match sink.deliver(Finding::Error(error.clone())) {
            Ok(()) => RootOutcome::Failed { entries, error },
            Err(_) => RootOutcome::Detached { entries },
        }
    }

    /// Returns `Ok(false)` if the sink closed or the session shut down mid-walk
    fn traverse<S: FindingSink>(&self, sink: &mut S, entries: &mut u64) -> EntryResult<bool> {
        let root = std::path::absolute(&self.root).map_err(|e| EntryError::from_io(&self.root, &e))?;
        let mut stack: Vec<DirectoryState> = Vec::new();
        let mut next = Some(root);

        loop {
            let path = match next.take() {
                Some(path) => path,
                None => match next_from_stack(&mut stack) {
                    Some(path) => path,
                    None => return Ok(true),
                },
            };

            if self.is_shutdown() {
                return Ok(false);
            }

            debug!("scanning: {}", path.display());

            let Inspection { entry, warnings } = self.classifier.inspect(&path)?;
            *entries += 1;
            if let Some(stats) = &self.stats {
                stats.record_entry();
            }

            for warning in warnings {
                if sink.deliver(Finding::Warning(warning)).is_err() {
                    return Ok(false);
                }
            }

            if entry.link.is_some() || !entry.kind.is_dir() {
                continue;
            }

            match DirectoryState::read(path) {
                Ok(state) => {
                    stack.push(state);
                    if let Some(stats) = &self.stats {
                        stats.record_dir();
                    }
                }
                Err(fault) => {
                    warn!("skipping children: {}", fault);
                    if let Some(stats) = &self.stats {
                        stats.record_skipped();
                    }
                }
            }
        }
    }
}

/// Walk `root`, delivering its findings into `sink`
pub fn walk<S: FindingSink>(root: &Path, classifier: &Classifier, sink: &mut S) -> RootOutcome {
    RootWalker::new(root, classifier).run(sink)
}

/// Walk `root` sequentially and collect its findings
pub fn walk_collect(root: &Path, classifier: &Classifier) -> Vec<Finding> {
    let mut findings = Vec::new();
    walk(root, classifier, &mut findings);
    findings
}

fn next_from_stack(stack: &mut Vec<DirectoryState>) -> Option<PathBuf> {
    loop {
        let state = stack.last_mut()?;
        if let Some(name) = state.next_name() {
            return Some(state.path.join(name));
        }
        stack.pop();
    }
}

/// Sorted listing of one directory being traversed
#[derive(Debug)]
struct DirectoryState {
    path: PathBuf,
    names: std::vec::IntoIter<OsString>,
}

impl DirectoryState {
    fn read(path: PathBuf) -> EntryResult<Self> {
        let mut names = Vec::new();
        let read_dir = fs::read_dir(&path).map_err(|e| EntryError::from_io(&path, &e))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| EntryError::from_io(&path, &e))?;
            names.push(entry.file_name());
        }
        names.sort();

        Ok(Self {
            path,
            names: names.into_iter(),
        })
    }

    fn next_name(&mut self) -> Option<OsString> {
        self.names.next()
    }
}
