//! The fixed SSH permission policy

use super::catalog::{ExpectedKind, Matcher, PolicyCatalog, Rule};
use super::mode::ModeExpectation;
use crate::entry::EntryKind;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// SSH key basenames (`id_rsa`, `id_ed25519.pub`, ...)
static SSH_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^id_.+$").expect("Invalid SSH key regex"));

/// SSH public key basenames
static SSH_PUBLIC_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^id_.+\.pub$").expect("Invalid SSH public key regex"));

fn rule(
    id: &'static str,
    description: &'static str,
    matcher: Matcher,
    expected_kind: ExpectedKind,
    expected_mode: ModeExpectation,
) -> Rule {
    Rule {
        id,
        description,
        matcher,
        expected_kind,
        expected_mode,
    }
}

/// Build the standard catalog; `home` feeds the home directory rule
pub fn standard_rules(home: &Path) -> Vec<Rule> {
    use ExpectedKind::{Directory, File};
    use ModeExpectation::{Exact, Mask};

    vec![
        rule("etc", "/etc is a 0755 directory", Matcher::path("/etc"), Directory, Exact(0o755)),
        rule(
            "etc-ssh",
            "/etc/ssh is a 0755 directory",
            Matcher::path("/etc/ssh"),
            Directory,
            Exact(0o755),
        ),
        rule("ssh-dir", ".ssh is a 0700 directory", Matcher::name(".ssh"), Directory, Exact(0o700)),
        rule(
            "ssh-config",
            ".ssh/config is a 0400 file",
            Matcher::name("config").under(".ssh"),
            File,
            Exact(0o400),
        ),
        rule(
            "ssh-private-key",
            ".ssh/id_* private keys are 0600 files",
            Matcher::pattern(SSH_KEY_PATTERN.clone())
                .excluding(SSH_PUBLIC_KEY_PATTERN.clone())
                .under(".ssh"),
            File,
            Exact(0o600),
        ),
        rule(
            "ssh-public-key",
            ".ssh/id_*.pub public keys are 0644 files",
            Matcher::pattern(SSH_PUBLIC_KEY_PATTERN.clone()).under(".ssh"),
            File,
            Exact(0o644),
        ),
        rule(
            "authorized-keys",
            "authorized_keys is a 0600 file",
            Matcher::name("authorized_keys"),
            File,
            Exact(0o600),
        ),
        rule(
            "known-hosts",
            "known_hosts is a 0644 file",
            Matcher::name("known_hosts"),
            File,
            Exact(0o644),
        ),
        rule(
            "home-dir",
            "the home directory is a 0755 directory",
            Matcher::path(home),
            Directory,
            Exact(0o755),
        ),
        rule(
            "dir-visible",
            "every directory is owner readable or searchable",
            Matcher::kind(EntryKind::Directory),
            Directory,
            Mask(0o500),
        ),
        rule(
            "file-visible",
            "every file is owner readable",
            Matcher::kind(EntryKind::File),
            File,
            Mask(0o400),
        ),
    ]
}

impl PolicyCatalog {
    /// The fixed SSH policy for a user whose home is `home`
    pub fn standard(home: &Path) -> Self {
        Self::from_rules(standard_rules(home))
    }
}
