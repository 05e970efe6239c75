//! Scan session - runs one worker per root and merges their findings
//!
//! The session is responsible for:
//! - Resolving the home directory and building the shared catalog
//! - Starting one worker thread per root
//! - Delivering warnings and errors to the consumer as they are found
//! - Emitting a single completion marker after every root has terminated
//! - Final statistics

use crate::classifier::Classifier;
use crate::config::ScanConfig;
use crate::error::{AuditError, Result, ScanError, WorkerError};
use crate::policy::{PolicyCatalog, Warning};
use crate::walker::sink::{
    finding_channel, Finding, FindingReceiver, FindingSender, FindingSink, SessionEvent,
    SinkClosed,
};
use crate::walker::worker::{aggregate_stats, RootWorker, WorkerStats};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a finished session
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Every policy mismatch, in arrival order
    pub warnings: Vec<Warning>,

    /// At most one per root
    pub errors: Vec<ScanError>,

    /// Roots the session was started with
    pub roots: usize,

    /// Entries classified across all roots
    pub entries_scanned: u64,

    /// Directories whose children could not be listed
    pub dirs_skipped: u64,

    /// Time from start until the completion marker was received
    pub duration: Duration,
}

impl ScanReport {
    /// True when the scan found nothing to report
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }

    pub fn warning_lines(&self) -> Vec<String> {
        self.warnings.iter().map(|w| w.message.clone()).collect()
    }

    pub fn error_lines(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Snapshot of a running session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanProgress {
    pub roots: usize,
    pub roots_finished: usize,
    pub entries_scanned: u64,
    pub directories: u64,
    pub skipped: u64,
    pub warnings: u64,
    pub errors: u64,
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Entries classified per second so far
    pub fn entries_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.entries_scanned as f64 / secs
        } else {
            0.0
        }
    }
}

/// A running multi-root scan
///
/// Roots are scanned concurrently and independently. Findings from
/// different roots interleave arbitrarily; within one root they arrive in
/// traversal order. [`SessionEvent::Completed`] is delivered exactly once,
/// after every finding of every root.
pub struct ScanSession {
    roots: Vec<PathBuf>,
    home: PathBuf,
    receiver: FindingReceiver,
    worker_stats: Vec<Arc<WorkerStats>>,
    start: Instant,
    completion: Option<JoinHandle<()>>,
    completed: bool,
}

impl ScanSession {
    /// Start scanning every root in `config`
    ///
    /// Fails before any root is touched if the home directory cannot be
    /// resolved. If a thread cannot be started, workers already running are
    /// shut down and joined before the error is returned.
    pub fn start(config: &ScanConfig) -> Result<Self> {
        let start = Instant::now();
        let home = resolve_home(config.home.as_deref())?;

        info!(
            roots = config.roots.len(),
            home = %home.display(),
            "Starting scan session"
        );

        let catalog = Arc::new(PolicyCatalog::standard(&home));
        let classifier = Classifier::new(catalog);
        let (sender, receiver) = finding_channel();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(config.roots.len());
        for (id, root) in config.roots.iter().enumerate() {
            let spawned = RootWorker::spawn(
                id,
                root.clone(),
                classifier.clone(),
                sender.clone(),
                Arc::clone(&shutdown),
            );
            match spawned {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    abandon(workers, &shutdown);
                    return Err(e.into());
                }
            }
        }

        debug!("Spawned {} root workers", workers.len());

        Self::launch(home, start, workers, sender, receiver, &shutdown)
    }

    /// Wrap already running workers in a session
    ///
    /// The completion thread joins every worker in order and then sends the
    /// marker. A panicked worker becomes a `ScanError::Aborted` for its root.
    fn launch(
        home: PathBuf,
        start: Instant,
        workers: Vec<RootWorker>,
        sender: FindingSender,
        receiver: FindingReceiver,
        shutdown: &AtomicBool,
    ) -> Result<Self> {
        let roots = workers.iter().map(|w| w.root().to_path_buf()).collect();
        let worker_stats: Vec<_> = workers.iter().map(RootWorker::stats).collect();

        let spawned = thread::Builder::new()
            .name("scan-completion".into())
            .spawn(move || join_and_complete(workers, sender));

        let completion = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                // the closure, and with it the worker handles, was dropped;
                // the detached workers stop at their next entry
                shutdown.store(true, Ordering::Relaxed);
                return Err(AuditError::from(WorkerError::SpawnFailed {
                    thread: "scan-completion".into(),
                    reason: e.to_string(),
                }));
            }
        };

        Ok(Self {
            roots,
            home,
            receiver,
            worker_stats,
            start,
            completion: Some(completion),
            completed: false,
        })
    }

    /// Home directory the catalog was built for
    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Block until the next event
    ///
    /// Returns `None` after [`SessionEvent::Completed`] has been delivered.
    pub fn recv(&mut self) -> Option<SessionEvent> {
        if self.completed {
            return None;
        }
        match self.receiver.recv() {
            Some(event) => Some(self.observe(event)),
            None => self.disconnected(),
        }
    }

    /// Like [`recv`](Self::recv) but waits at most `timeout`
    ///
    /// Returns `None` on timeout as well; check [`is_completed`](Self::is_completed)
    /// to tell the two apart.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<SessionEvent> {
        if self.completed {
            return None;
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(Some(event)) => Some(self.observe(event)),
            Ok(None) => None,
            Err(SinkClosed) => self.disconnected(),
        }
    }

    fn observe(&mut self, event: SessionEvent) -> SessionEvent {
        if event == SessionEvent::Completed {
            self.completed = true;
        }
        event
    }

    // every producer dropped without a marker, which only happens if the
    // completion thread died
    fn disconnected(&mut self) -> Option<SessionEvent> {
        warn!("Session channel closed before completion");
        self.completed = true;
        Some(SessionEvent::Completed)
    }

    /// Whether the completion marker has been received
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Iterate over events up to and including the completion marker
    pub fn events(&mut self) -> impl Iterator<Item = SessionEvent> + '_ {
        std::iter::from_fn(move || self.recv())
    }

    /// Snapshot the session's counters
    pub fn progress(&self) -> ScanProgress {
        let (entries, dirs, skipped, _, finished) = aggregate_stats(&self.worker_stats);
        let stats = self.receiver.stats();

        ScanProgress {
            roots: self.roots.len(),
            roots_finished: finished,
            entries_scanned: entries,
            directories: dirs,
            skipped,
            warnings: stats.warnings(),
            errors: stats.errors(),
            elapsed: self.start.elapsed(),
        }
    }

    /// Drain every remaining event and return the collected report
    pub fn wait(mut self) -> ScanReport {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        while let Some(event) = self.recv() {
            match event {
                SessionEvent::Warning(w) => warnings.push(w),
                SessionEvent::Error(e) => errors.push(e),
                SessionEvent::Completed => break,
            }
        }

        let duration = self.start.elapsed();
        if let Some(handle) = self.completion.take() {
            if handle.join().is_err() {
                warn!("Completion thread panicked");
            }
        }

        let (entries_scanned, _, dirs_skipped, _, _) = aggregate_stats(&self.worker_stats);

        info!(
            warnings = warnings.len(),
            errors = errors.len(),
            entries = entries_scanned,
            duration_ms = duration.as_millis() as u64,
            "Scan session complete"
        );

        ScanReport {
            warnings,
            errors,
            roots: self.roots.len(),
            entries_scanned,
            dirs_skipped,
            duration,
        }
    }
}

/// Scan `roots` with the current user's home directory and wait for the result
pub fn scan<I, P>(roots: I) -> Result<ScanReport>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    scan_with(&ScanConfig::new(roots))
}

/// Scan with an explicit configuration and wait for the result
pub fn scan_with(config: &ScanConfig) -> Result<ScanReport> {
    Ok(ScanSession::start(config)?.wait())
}

fn resolve_home(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(home) = configured {
        return Ok(home.to_path_buf());
    }
    dirs::home_dir().ok_or_else(|| AuditError::HomeDirectoryUnavailable {
        reason: "cannot determine the current user's home directory".to_string(),
    })
}

fn join_and_complete(workers: Vec<RootWorker>, mut sink: FindingSender) {
    for worker in workers {
        let root = worker.root().to_path_buf();
        let stats = worker.stats();
        match worker.join() {
            Ok(outcome) => {
                debug!(root = %root.display(), entries = outcome.entries(), "Root done");
            }
            Err(WorkerError::Panicked { .. }) => {
                warn!(root = %root.display(), "Root worker panicked");
                stats.mark_finished();
                let error = ScanError::Aborted {
                    root,
                    message: "worker panicked".into(),
                };
                let _ = sink.deliver(Finding::Error(error));
            }
            Err(e) => warn!("Failed to join worker: {}", e),
        }
    }
    // consumer may already be gone
    let _ = sink.complete();
}

/// Stop and join workers of a session that failed to start
fn abandon(workers: Vec<RootWorker>, shutdown: &AtomicBool) {
    shutdown.store(true, Ordering::Relaxed);
    for worker in workers {
        if let Err(e) = worker.join() {
            warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;
    use crate::walker::tree::walk_collect;
    use std::collections::HashSet;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn touch(path: &Path, mode: u32) {
        fs::write(path, b"x").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    fn config(roots: &[PathBuf]) -> ScanConfig {
        ScanConfig::new(roots.to_vec()).with_home("/nonexistent-home")
    }

    #[test]
    fn test_multiple_roots() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        touch(&a.join("authorized_keys"), 0o644);
        touch(&b.join("known_hosts"), 0o600);

        let report = scan_with(&config(&[a.clone(), b.clone()])).unwrap();
        assert_eq!(report.roots, 2);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.errors.is_empty());
        assert!(!report.is_clean());
        assert_eq!(report.entries_scanned, 4);
    }

    #[test]
    fn test_completion_arrives_last() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("r");
        fs::create_dir(&root).unwrap();
        for i in 0..50 {
            let sub = root.join(format!("{i:02}"));
            fs::create_dir(&sub).unwrap();
            touch(&sub.join("authorized_keys"), 0o644);
        }

        let mut session = ScanSession::start(&config(&[root])).unwrap();
        let events: Vec<_> = session.events().collect();

        assert_eq!(events.len(), 51);
        assert_eq!(events.last(), Some(&SessionEvent::Completed));
        assert_eq!(
            events.iter().filter(|e| **e == SessionEvent::Completed).count(),
            1
        );
        assert!(session.is_completed());
        assert_eq!(session.recv(), None);
    }

    #[test]
    fn test_concurrent_matches_sequential() {
        let dir = tempdir().unwrap();
        let mut roots = Vec::new();
        for r in 0..4 {
            let root = dir.path().join(format!("root{r}"));
            let ssh = root.join(".ssh");
            fs::create_dir_all(&ssh).unwrap();
            fs::set_permissions(&ssh, fs::Permissions::from_mode(0o755)).unwrap();
            touch(&ssh.join("id_ed25519"), 0o644);
            touch(&ssh.join("id_ed25519.pub"), 0o600);
            roots.push(root);
        }

        let report = scan_with(&config(&roots)).unwrap();
        let concurrent: HashSet<String> = report.warning_lines().into_iter().collect();

        let classifier = Classifier::new(Arc::new(PolicyCatalog::standard(Path::new(
            "/nonexistent-home",
        ))));
        let sequential: HashSet<String> = roots
            .iter()
            .flat_map(|root| walk_collect(root, &classifier))
            .filter_map(|f| f.as_warning().map(|w| w.message.clone()))
            .collect();

        assert_eq!(report.warnings.len(), 12);
        assert_eq!(concurrent, sequential);
    }

    #[test]
    fn test_missing_root_does_not_affect_others() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good");
        fs::create_dir(&good).unwrap();
        touch(&good.join("authorized_keys"), 0o644);
        let missing = dir.path().join("missing");

        let report = scan_with(&config(&[missing.clone(), good])).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].root(), missing.as_path());
        assert_eq!(report.errors[0].fault_kind(), Some(FaultKind::NotFound));
    }

    #[test]
    fn test_explicit_home() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("alice");
        fs::create_dir(&home).unwrap();
        fs::set_permissions(&home, fs::Permissions::from_mode(0o700)).unwrap();

        let session = ScanSession::start(&ScanConfig::new([home.clone()]).with_home(&home)).unwrap();
        assert_eq!(session.home(), home.as_path());

        let report = session.wait();
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].rule_id, "home-dir");
        assert_eq!(
            report.warnings[0].message,
            format!("{}: expected chmod 0755, got 0700", home.display())
        );
    }

    #[test]
    fn test_panicked_worker_aborts_only_its_root() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good");
        fs::create_dir(&good).unwrap();
        touch(&good.join("authorized_keys"), 0o644);
        let broken = dir.path().join("broken");

        let classifier = Classifier::new(Arc::new(PolicyCatalog::standard(Path::new(
            "/nonexistent-home",
        ))));
        let (sender, receiver) = finding_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let workers = vec![
            RootWorker::spawn_task(0, broken.clone(), |_, _| panic!("classifier failure")).unwrap(),
            RootWorker::spawn(1, good.clone(), classifier, sender.clone(), Arc::clone(&shutdown))
                .unwrap(),
        ];

        let mut session = ScanSession::launch(
            PathBuf::from("/nonexistent-home"),
            Instant::now(),
            workers,
            sender,
            receiver,
            &shutdown,
        )
        .unwrap();
        let events: Vec<_> = session.events().collect();

        let errors: Vec<&ScanError> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Error(err) => Some(err),
                _ => None,
            })
            .collect();
        assert_eq!(
            errors,
            [&ScanError::Aborted {
                root: broken.clone(),
                message: "worker panicked".into(),
            }]
        );
        assert_eq!(errors[0].to_string(), format!("{}: scan aborted: worker panicked", broken.display()));

        let warnings: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Warning(w) => Some(w.path.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(warnings, [good.join("authorized_keys")]);

        assert_eq!(events.last(), Some(&SessionEvent::Completed));
        assert_eq!(
            events.iter().filter(|e| **e == SessionEvent::Completed).count(),
            1
        );
        assert_eq!(session.progress().roots_finished, 2);
    }

    #[test]
    fn test_abandon_stops_running_workers() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("tree");
        for i in 0..20 {
            fs::create_dir_all(root.join(format!("d{i:02}"))).unwrap();
        }

        let classifier = Classifier::new(Arc::new(PolicyCatalog::standard(Path::new(
            "/nonexistent-home",
        ))));
        let (sender, receiver) = finding_channel();
        let shutdown = Arc::new(AtomicBool::new(true));
        let worker = RootWorker::spawn(0, root, classifier, sender, Arc::clone(&shutdown)).unwrap();
        let stats = worker.stats();

        abandon(vec![worker], &shutdown);
        assert!(stats.is_finished());
        assert_eq!(stats.entries.load(Ordering::Relaxed), 0);
        assert_eq!(receiver.recv(), None);
    }

    #[test]
    fn test_no_roots_completes_immediately() {
        let mut session = ScanSession::start(&config(&[])).unwrap();
        assert_eq!(session.recv(), Some(SessionEvent::Completed));
        assert_eq!(session.progress().roots, 0);
    }

    #[test]
    fn test_progress_after_wait() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("f"), 0o644);

        let mut session = ScanSession::start(&config(&[dir.path().to_path_buf()])).unwrap();
        while session.recv().is_some() {}
        let progress = session.progress();
        assert_eq!(progress.roots_finished, 1);
        assert_eq!(progress.entries_scanned, 2);
        assert_eq!(progress.warnings, 0);
    }
}
