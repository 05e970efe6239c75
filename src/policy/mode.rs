//! Mode validation
//!
//! Pure comparisons between an observed permission mode and a rule's
//! expectation, plus the message formats downstream tooling greps for.
//! Only the low 9 bits take part; setuid, setgid and sticky are ignored.

use crate::entry::{EntryKind, MODE_MASK};
use std::fmt;
use std::path::Path;

/// Outcome of a single mode comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeCheck {
    Match,
    Mismatch,
}

impl ModeCheck {
    pub fn is_match(&self) -> bool {
        *self == ModeCheck::Match
    }
}

/// Expected permission mode of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeExpectation {
    /// Observed mode must equal this value
    Exact(u32),
    /// Observed mode must share at least one bit with this mask
    Mask(u32),
}

impl ModeExpectation {
    pub fn check(&self, observed: u32) -> ModeCheck {
        match *self {
            ModeExpectation::Exact(expected) => check_exact(observed, expected),
            ModeExpectation::Mask(mask) => check_mask(observed, mask),
        }
    }

    /// The value shown after `expected chmod`
    pub fn value(&self) -> u32 {
        match *self {
            ModeExpectation::Exact(v) | ModeExpectation::Mask(v) => v & MODE_MASK,
        }
    }
}

impl fmt::Display for ModeExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeExpectation::Exact(_) => write!(f, "{:04o}", self.value()),
            ModeExpectation::Mask(_) => write!(f, "mask {:04o}", self.value()),
        }
    }
}

/// Match iff the low 9 bits are identical
pub fn check_exact(observed: u32, expected: u32) -> ModeCheck {
    if observed & MODE_MASK == expected & MODE_MASK {
        ModeCheck::Match
    } else {
        ModeCheck::Mismatch
    }
}

/// Match iff the low 9 bits intersect `mask`
pub fn check_mask(observed: u32, mask: u32) -> ModeCheck {
    if observed & MODE_MASK & mask != 0 {
        ModeCheck::Match
    } else {
        ModeCheck::Mismatch
    }
}

/// `<path>: expected chmod NNNN, got MMMM`
pub fn mode_mismatch_message(path: &Path, expected: u32, observed: u32) -> String {
    format!(
        "{}: expected chmod {:04o}, got {:04o}",
        path.display(),
        expected & MODE_MASK,
        observed & MODE_MASK
    )
}

/// `<path>: expected <kind>, got <kind>`
pub fn kind_mismatch_message(path: &Path, expected: EntryKind, observed: EntryKind) -> String {
    format!("{}: expected {}, got {}", path.display(), expected, observed)
}
