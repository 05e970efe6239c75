//! Rule catalog and evaluator
//!
//! A [`PolicyCatalog`] is an ordered, immutable list of [`Rule`]s. One
//! generic evaluator applies every rule to an [`Entry`]; rules carry all
//! their variation as data.

use super::mode::{kind_mismatch_message, mode_mismatch_message, ModeExpectation};
use super::{Expected, Warning};
use crate::entry::{Entry, EntryKind};
use regex::Regex;
use std::path::PathBuf;
use tracing::trace;

/// Kind a rule expects its entries to have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedKind {
    File,
    Directory,
    Any,
}

impl ExpectedKind {
    /// The concrete kind demanded, or `None` for don't-care
    pub fn required(&self) -> Option<EntryKind> {
        match self {
            ExpectedKind::File => Some(EntryKind::File),
            ExpectedKind::Directory => Some(EntryKind::Directory),
            ExpectedKind::Any => None,
        }
    }
}

/// What part of an entry a matcher looks at
#[derive(Debug, Clone)]
pub enum Target {
    /// Fixed absolute path
    Path(PathBuf),
    /// Exact basename
    Name(String),
    /// Basename regex, minus an optional exclusion
    Pattern {
        include: Regex,
        exclude: Option<Regex>,
    },
    /// Every entry of this kind
    Kind(EntryKind),
}

/// Entry selector of a rule
#[derive(Debug, Clone)]
pub struct Matcher {
    target: Target,
    parent: Option<String>,
}

impl Matcher {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::new(Target::Path(path.into()))
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::new(Target::Name(name.into()))
    }

    pub fn pattern(include: Regex) -> Self {
        Self::new(Target::Pattern {
            include,
            exclude: None,
        })
    }

    pub fn kind(kind: EntryKind) -> Self {
        Self::new(Target::Kind(kind))
    }

    fn new(target: Target) -> Self {
        Self {
            target,
            parent: None,
        }
    }

    /// Additionally require the parent directory to have this name
    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Reject basenames matching `exclude`; only meaningful for patterns
    pub fn excluding(mut self, exclude: Regex) -> Self {
        if let Target::Pattern { exclude: slot, .. } = &mut self.target {
            *slot = Some(exclude);
        }
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// True if this matcher selects `entry`
    pub fn selects(&self, entry: &Entry) -> bool {
        let hit = match &self.target {
            Target::Path(path) => entry.path == *path,
            Target::Name(name) => entry.name == *name,
            Target::Pattern { include, exclude } => {
                include.is_match(&entry.name)
                    && !exclude.as_ref().is_some_and(|re| re.is_match(&entry.name))
            }
            Target::Kind(kind) => entry.kind == *kind,
        };

        hit && match &self.parent {
            Some(parent) => entry.parent_name().as_deref() == Some(parent.as_str()),
            None => true,
        }
    }
}

/// One declarative policy rule
#[derive(Debug, Clone)]
pub struct Rule {
    /// Stable identifier
    pub id: &'static str,

    /// Human-readable summary for listings
    pub description: &'static str,

    /// Which entries the rule applies to
    pub matcher: Matcher,

    /// Required entry kind
    pub expected_kind: ExpectedKind,

    /// Required permission mode
    pub expected_mode: ModeExpectation,
}

impl Rule {
    /// Evaluate the rule against `entry`
    ///
    /// A kind mismatch is reported on its own; the mode is only compared
    /// once the kind is right.
    pub fn evaluate(&self, entry: &Entry) -> Option<Warning> {
        if !self.matcher.selects(entry) {
            return None;
        }

        if let Some(required) = self.expected_kind.required() {
            if entry.kind != required {
                return Some(Warning {
                    path: entry.path.clone(),
                    rule_id: self.id,
                    expected: Expected::Kind(required),
                    observed_kind: entry.kind,
                    observed_mode: entry.mode,
                    message: kind_mismatch_message(&entry.path, required, entry.kind),
                });
            }
        }

        if self.expected_mode.check(entry.mode).is_match() {
            return None;
        }

        Some(Warning {
            path: entry.path.clone(),
            rule_id: self.id,
            expected: Expected::Mode(self.expected_mode),
            observed_kind: entry.kind,
            observed_mode: entry.mode,
            message: mode_mismatch_message(&entry.path, self.expected_mode.value(), entry.mode),
        })
    }
}

/// Immutable ordered rule set
#[derive(Debug, Clone)]
pub struct PolicyCatalog {
    rules: Vec<Rule>,
}

impl PolicyCatalog {
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule to `entry`, in catalog order
    pub fn evaluate(&self, entry: &Entry) -> Vec<Warning> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let warning = rule.evaluate(entry)?;
                trace!(rule = rule.id, path = %entry.path.display(), "rule fired");
                Some(warning)
            })
            .collect()
    }
}
