//! Integration tests for permwalk
//!
//! Trees are built in temporary directories with exact modes. The home
//! directory is always pinned so results do not depend on the real user.

use permwalk::walker::{walk_collect, SessionEvent};
use permwalk::{
    scan_with, Classifier, FaultKind, PolicyCatalog, ScanConfig, ScanSession,
};
use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

const NO_HOME: &str = "/nonexistent-home";

fn mkdir(path: &Path, mode: u32) {
    fs::create_dir_all(path).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

fn touch(path: &Path, mode: u32) {
    fs::write(path, b"data").unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

/// Permission bits are not enforced for a privileged user
fn permissions_enforced(dir: &Path) -> bool {
    let locked = dir.join("locked-check");
    mkdir(&locked, 0o000);
    let enforced = fs::read_dir(&locked).is_err();
    fs::remove_dir(&locked).unwrap();
    enforced
}

fn scan_lines(roots: &[PathBuf]) -> (Vec<String>, Vec<String>) {
    let report = scan_with(&ScanConfig::new(roots.to_vec()).with_home(NO_HOME)).unwrap();
    (report.warning_lines(), report.error_lines())
}

/// A home tree that satisfies every rule
fn conforming_home(base: &Path) -> PathBuf {
    let home = base.join("alice");
    mkdir(&home, 0o755);
    let ssh = home.join(".ssh");
    mkdir(&ssh, 0o700);
    touch(&ssh.join("id_rsa"), 0o600);
    touch(&ssh.join("id_rsa.pub"), 0o644);
    touch(&ssh.join("authorized_keys"), 0o600);
    touch(&ssh.join("known_hosts"), 0o644);
    touch(&ssh.join("config"), 0o400);
    home
}

#[test]
fn test_ssh_dir_too_open() {
    let dir = tempdir().unwrap();
    let ssh = dir.path().join(".ssh");
    mkdir(&ssh, 0o755);

    let (warnings, errors) = scan_lines(&[ssh.clone()]);
    assert_eq!(
        warnings,
        [format!("{}: expected chmod 0700, got 0755", ssh.display())]
    );
    assert!(errors.is_empty());
}

#[test]
fn test_authorized_keys_too_open() {
    let dir = tempdir().unwrap();
    let keys = dir.path().join("authorized_keys");
    touch(&keys, 0o644);

    let (warnings, _) = scan_lines(&[dir.path().to_path_buf()]);
    assert_eq!(
        warnings,
        [format!("{}: expected chmod 0600, got 0644", keys.display())]
    );
}

#[test]
fn test_public_key_too_closed() {
    let dir = tempdir().unwrap();
    let ssh = dir.path().join(".ssh");
    mkdir(&ssh, 0o700);
    let public = ssh.join("id_rsa.pub");
    touch(&public, 0o600);

    let (warnings, _) = scan_lines(&[ssh]);
    assert_eq!(
        warnings,
        [format!("{}: expected chmod 0644, got 0600", public.display())]
    );
}

#[test]
fn test_private_key_outside_ssh_dir_ignored() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("id_rsa"), 0o644);

    let (warnings, errors) = scan_lines(&[dir.path().to_path_buf()]);
    assert!(warnings.is_empty());
    assert!(errors.is_empty());
}

#[test]
fn test_known_hosts_directory_kind_mismatch_only() {
    let dir = tempdir().unwrap();
    let known = dir.path().join("known_hosts");
    mkdir(&known, 0o755);

    let (warnings, _) = scan_lines(&[dir.path().to_path_buf()]);
    assert_eq!(
        warnings,
        [format!("{}: expected file, got directory", known.display())]
    );
}

#[test]
fn test_conforming_home_is_clean() {
    let dir = tempdir().unwrap();
    let home = conforming_home(dir.path());

    let report = scan_with(&ScanConfig::new([home.clone()]).with_home(&home)).unwrap();
    assert!(report.is_clean(), "unexpected: {:?}", report.warning_lines());
    assert_eq!(report.entries_scanned, 7);
}

#[test]
fn test_home_dir_rule_uses_configured_home() {
    let dir = tempdir().unwrap();
    let home = conforming_home(dir.path());
    fs::set_permissions(&home, fs::Permissions::from_mode(0o750)).unwrap();

    // without the override the directory is just another directory
    let (warnings, _) = scan_lines(&[home.clone()]);
    assert!(warnings.is_empty());

    let report = scan_with(&ScanConfig::new([home.clone()]).with_home(&home)).unwrap();
    assert_eq!(
        report.warning_lines(),
        [format!("{}: expected chmod 0755, got 0750", home.display())]
    );
}

#[test]
fn test_mask_rules_apply_everywhere() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("data");
    mkdir(&root, 0o755);
    let hidden = root.join("notes.txt");
    touch(&hidden, 0o200);

    let (warnings, _) = scan_lines(&[root]);
    assert_eq!(
        warnings,
        [format!("{}: expected chmod 0400, got 0200", hidden.display())]
    );
}

#[test]
fn test_symlink_evaluated_through_target() {
    let dir = tempdir().unwrap();
    let outside = dir.path().join("outside");
    mkdir(&outside, 0o755);
    let target = outside.join("authorized_keys");
    touch(&target, 0o666);

    let root = dir.path().join("root");
    mkdir(&root, 0o755);
    symlink("../outside/authorized_keys", root.join("keys")).unwrap();

    let (warnings, errors) = scan_lines(&[root]);
    assert_eq!(
        warnings,
        [format!("{}: expected chmod 0600, got 0666", target.display())]
    );
    assert!(errors.is_empty());
}

#[test]
fn test_symlinked_directory_not_walked() {
    let dir = tempdir().unwrap();
    let outside = dir.path().join("outside");
    mkdir(&outside, 0o755);
    touch(&outside.join("authorized_keys"), 0o644);

    let root = dir.path().join("root");
    mkdir(&root, 0o755);
    symlink(&outside, root.join("elsewhere")).unwrap();

    let report = scan_with(&ScanConfig::new([root]).with_home(NO_HOME)).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.entries_scanned, 2);
}

#[test]
fn test_dangling_symlink_ends_root() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    mkdir(&root, 0o755);
    let link = root.join("broken");
    symlink(root.join("nowhere"), &link).unwrap();

    let report = scan_with(&ScanConfig::new([root.clone()]).with_home(NO_HOME)).unwrap();
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].root(), root.as_path());
    assert_eq!(report.errors[0].fault_kind(), Some(FaultKind::NotFound));
    assert_eq!(report.error_lines(), [format!("{}: not found", link.display())]);
}

#[test]
fn test_missing_root_isolated() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("gone");
    let ssh = dir.path().join("present").join(".ssh");
    mkdir(&ssh, 0o777);

    let (warnings, errors) = scan_lines(&[missing.clone(), ssh.clone()]);
    assert_eq!(
        warnings,
        [format!("{}: expected chmod 0700, got 0777", ssh.display())]
    );
    assert_eq!(errors, [format!("{}: not found", missing.display())]);
}

#[test]
fn test_concurrent_equals_sequential_union() {
    let dir = tempdir().unwrap();
    let mut roots = Vec::new();
    for i in 0..6 {
        let home = dir.path().join(format!("user{i}"));
        mkdir(&home, 0o755);
        let ssh = home.join(".ssh");
        mkdir(&ssh, 0o750);
        touch(&ssh.join("id_ed25519"), 0o640);
        touch(&ssh.join("authorized_keys"), 0o600);
        mkdir(&home.join("projects").join("known_hosts"), 0o755);
        roots.push(home);
    }

    let (concurrent, errors) = scan_lines(&roots);
    assert!(errors.is_empty());

    let classifier = Classifier::new(Arc::new(PolicyCatalog::standard(Path::new(NO_HOME))));
    let sequential: Vec<String> = roots
        .iter()
        .flat_map(|root| walk_collect(root, &classifier))
        .filter_map(|f| f.as_warning().map(|w| w.message.clone()))
        .collect();

    assert_eq!(concurrent.len(), sequential.len());
    assert_eq!(
        concurrent.into_iter().collect::<HashSet<_>>(),
        sequential.into_iter().collect::<HashSet<_>>()
    );
}

#[test]
fn test_per_root_order_preserved() {
    let dir = tempdir().unwrap();
    let mut roots = Vec::new();
    for r in 0..3 {
        let root = dir.path().join(format!("r{r}"));
        mkdir(&root, 0o755);
        for i in 0..20 {
            let sub = root.join(format!("{i:02}"));
            mkdir(&sub, 0o755);
            touch(&sub.join("authorized_keys"), 0o644);
        }
        roots.push(root);
    }

    let report = scan_with(&ScanConfig::new(roots.clone()).with_home(NO_HOME)).unwrap();
    for root in &roots {
        let paths: Vec<&PathBuf> = report
            .warnings
            .iter()
            .map(|w| &w.path)
            .filter(|p| p.starts_with(root))
            .collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths.len(), 20);
        assert_eq!(paths, sorted);
    }
}

#[test]
fn test_completion_marker_last_and_once() {
    let dir = tempdir().unwrap();
    let roots: Vec<PathBuf> = (0..4)
        .map(|i| {
            let ssh = dir.path().join(format!("h{i}")).join(".ssh");
            mkdir(&ssh, 0o755);
            touch(&ssh.join("id_rsa"), 0o644);
            ssh
        })
        .chain(std::iter::once(dir.path().join("missing")))
        .collect();

    let mut session = ScanSession::start(&ScanConfig::new(roots).with_home(NO_HOME)).unwrap();
    let events: Vec<SessionEvent> = session.events().collect();

    // 2 warnings per existing root plus one error
    assert_eq!(events.len(), 4 * 2 + 1 + 1);
    assert_eq!(events.last(), Some(&SessionEvent::Completed));
    assert_eq!(
        events.iter().filter(|e| matches!(e, SessionEvent::Completed)).count(),
        1
    );
    assert!(session.recv().is_none());
}

#[test]
fn test_etc_ssh_rule_in_catalog() {
    use permwalk::{Entry, EntryKind};

    let catalog = PolicyCatalog::standard(Path::new(NO_HOME));
    let warnings = catalog.evaluate(&Entry::new("/etc/ssh", EntryKind::Directory, 0o700));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "/etc/ssh: expected chmod 0755, got 0700");
}

#[test]
fn test_unlistable_directory_keeps_sibling_findings() {
    let dir = tempdir().unwrap();
    if !permissions_enforced(dir.path()) {
        eprintln!("skipping: permission bits are not enforced for this user");
        return;
    }

    let root = dir.path().join("r");
    let unlistable = root.join("a");
    mkdir(&unlistable, 0o300);
    let keys = root.join("b").join("authorized_keys");
    mkdir(&root.join("b"), 0o755);
    touch(&keys, 0o644);

    let report = scan_with(&ScanConfig::new([root.clone()]).with_home(NO_HOME)).unwrap();
    fs::set_permissions(&unlistable, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(
        report.warning_lines(),
        [format!("{}: expected chmod 0600, got 0644", keys.display())]
    );
    assert!(report.errors.is_empty());
    assert_eq!(report.entries_scanned, 4);
    assert_eq!(report.dirs_skipped, 1);
}

#[test]
fn test_unsearchable_directory_denies_entry() {
    let dir = tempdir().unwrap();
    if !permissions_enforced(dir.path()) {
        eprintln!("skipping: permission bits are not enforced for this user");
        return;
    }

    // readable but not searchable: names list, metadata does not
    let root = dir.path().join("r");
    let locked = root.join("locked");
    mkdir(&locked, 0o755);
    touch(&locked.join("authorized_keys"), 0o600);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o600)).unwrap();
    let other = dir.path().join("other").join(".ssh");
    mkdir(&other, 0o755);

    let report = scan_with(
        &ScanConfig::new([root.clone(), other.clone()]).with_home(NO_HOME),
    )
    .unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].root(), root.as_path());
    assert_eq!(report.errors[0].fault_kind(), Some(FaultKind::AccessDenied));
    assert_eq!(
        report.error_lines(),
        [format!("{}: access denied", locked.join("authorized_keys").display())]
    );
    assert_eq!(
        report.warning_lines(),
        [format!("{}: expected chmod 0700, got 0755", other.display())]
    );
}
