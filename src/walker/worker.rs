//! Root worker threads
//!
//! Each worker:
//! - Owns exactly one root and walks it sequentially
//! - Shares the catalog read-only through its classifier
//! - Sends findings into its own clone of the session sender
//! - Ends after its root completes or faults; nothing is retried
//! - Stops early only when the session shuts down during start-up

use crate::classifier::Classifier;
use crate::error::WorkerError;
use crate::walker::sink::FindingSender;
use crate::walker::tree::{RootOutcome, RootWalker};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Entries classified
    pub entries: AtomicU64,

    /// Directories listed
    pub dirs: AtomicU64,

    /// Directories whose children could not be listed
    pub skipped: AtomicU64,

    /// Faults (at most one per root)
    pub errors: AtomicU64,

    /// Set once the walk has returned
    pub finished: AtomicBool,
}

impl WorkerStats {
    pub(crate) fn record_entry(&self) {
        self.entries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dir(&self) {
        self.dirs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// A worker thread scanning one root
pub struct RootWorker {
    root: PathBuf,

    /// Thread handle
    handle: Option<JoinHandle<RootOutcome>>,

    stats: Arc<WorkerStats>,
}

impl RootWorker {
    /// Spawn a new worker thread walking `root`
    pub fn spawn(
        id: usize,
        root: PathBuf,
        classifier: Classifier,
        sink: FindingSender,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        Self::spawn_task(id, root, move |root, stats| {
            worker_loop(id, root, classifier, sink, stats, shutdown)
        })
    }

    /// Spawn a worker thread that runs `task` for `root`
    pub(crate) fn spawn_task<F>(id: usize, root: PathBuf, task: F) -> Result<Self, WorkerError>
    where
        F: FnOnce(PathBuf, Arc<WorkerStats>) -> RootOutcome + Send + 'static,
    {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);
        let thread_root = root.clone();
        let name = format!("root-{}", id);

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || task(thread_root, stats_clone))
            .map_err(|e| WorkerError::SpawnFailed {
                thread: name,
                reason: e.to_string(),
            })?;

        Ok(Self {
            root,
            handle: Some(handle),
            stats,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<RootOutcome, WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked {
                root: self.root.clone(),
            }),
            None => Ok(RootOutcome::Completed { entries: 0 }),
        }
    }
}

fn worker_loop(
    id: usize,
    root: PathBuf,
    classifier: Classifier,
    mut sink: FindingSender,
    stats: Arc<WorkerStats>,
    shutdown: Arc<AtomicBool>,
) -> RootOutcome {
    debug!(worker = id, root = %root.display(), "Worker starting");

    let outcome = RootWalker::new(&root, &classifier)
        .with_stats(Arc::clone(&stats))
        .with_shutdown(shutdown)
        .run(&mut sink);

    stats.mark_finished();

    debug!(
        worker = id,
        root = %root.display(),
        entries = outcome.entries(),
        completed = outcome.is_completed(),
        "Worker finished"
    );

    outcome
}

/// Aggregate statistics from multiple workers: (entries, dirs, skipped, errors, finished)
pub fn aggregate_stats(stats: &[Arc<WorkerStats>]) -> (u64, u64, u64, u64, usize) {
    let mut entries = 0u64;
    let mut dirs = 0u64;
    let mut skipped = 0u64;
    let mut errors = 0u64;
    let mut finished = 0usize;

    for s in stats {
        entries += s.entries.load(Ordering::Relaxed);
        dirs += s.dirs.load(Ordering::Relaxed);
        skipped += s.skipped.load(Ordering::Relaxed);
        errors += s.errors.load(Ordering::Relaxed);
        if s.is_finished() {
            finished += 1;
        }
    }

    (entries, dirs, skipped, errors, finished)
}
