//! Permission policy
//!
//! The policy is a declarative [`PolicyCatalog`] of rules, each pairing an
//! entry matcher with an expected kind and mode. Evaluating an entry
//! against the catalog yields zero or more [`Warning`]s.
//!
//! | Rule | Target | Kind | Mode |
//! |------|--------|------|------|
//! | `etc`, `etc-ssh` | `/etc`, `/etc/ssh` | directory | 0755 |
//! | `ssh-dir` | `.ssh` | directory | 0700 |
//! | `ssh-config` | `.ssh/config` | file | 0400 |
//! | `ssh-private-key` | `.ssh/id_*` | file | 0600 |
//! | `ssh-public-key` | `.ssh/id_*.pub` | file | 0644 |
//! | `authorized-keys` | `authorized_keys` | file | 0600 |
//! | `known-hosts` | `known_hosts` | file | 0644 |
//! | `home-dir` | home directory | directory | 0755 |
//! | `dir-visible` | any directory | directory | mask 0500 |
//! | `file-visible` | any file | file | mask 0400 |

pub mod catalog;
pub mod mode;
pub mod rules;

pub use catalog::{ExpectedKind, Matcher, PolicyCatalog, Rule, Target};
pub use mode::{check_exact, check_mask, ModeCheck, ModeExpectation};

use crate::entry::EntryKind;
use std::fmt;
use std::path::PathBuf;

/// What a fired rule wanted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Kind(EntryKind),
    Mode(ModeExpectation),
}

/// A policy mismatch on one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub path: PathBuf,
    pub rule_id: &'static str,
    pub expected: Expected,
    pub observed_kind: EntryKind,
    pub observed_mode: u32,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
