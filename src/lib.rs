//! permwalk - SSH permission-mode auditor
//!
//! Walks one or more directory trees and compares the permission bits of
//! SSH trust material against a fixed policy: home directories, `.ssh`,
//! private and public keys, `authorized_keys`, `known_hosts`, `/etc` and
//! `/etc/ssh`. Every mismatch is reported as a warning line; unreadable or
//! vanished entries end their root's scan with a single error.
//!
//! # Features
//!
//! - **Declarative Policy**: rules are data in a [`PolicyCatalog`], each a
//!   matcher plus an expected kind and mode.
//!
//! - **Concurrent Roots**: every root is walked on its own thread; results
//!   stream back through one channel as they are found.
//!
//! - **Deterministic Per Root**: pre-order, name-sorted traversal, so one
//!   root's findings always come out in the same order.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐         ┌──────────────┐
//! │   root-0     │   │   root-1     │   ...   │   root-N     │
//! │  RootWalker  │   │  RootWalker  │         │  RootWalker  │
//! └──────┬───────┘   └──────┬───────┘         └──────┬───────┘
//!        │ classify + evaluate (shared Arc<PolicyCatalog>)
//!        └──────────────────┼────────────────────────┘
//!                           ▼
//!            ┌──────────────────────────┐
//!            │   Finding channel        │
//!            │  (crossbeam unbounded)   │
//!            └────────────┬─────────────┘
//!                         ▼
//!            ┌──────────────────────────┐
//!            │      ScanSession         │
//!            │  warnings, errors, then  │
//!            │  exactly one Completed   │
//!            └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! let report = permwalk::scan(["/home/alice"])?;
//! for line in report.warning_lines() {
//!     println!("{line}");
//! }
//! # Ok::<(), permwalk::AuditError>(())
//! ```

pub mod classifier;
pub mod config;
pub mod entry;
pub mod error;
pub mod policy;
pub mod progress;
pub mod walker;

pub use classifier::{classify, Classifier, Inspection};
pub use config::{CliArgs, ScanConfig};
pub use entry::{Entry, EntryKind};
pub use error::{AuditError, EntryError, FaultKind, Result, ScanError};
pub use policy::{PolicyCatalog, Warning};
pub use walker::{scan, scan_with, ScanProgress, ScanReport, ScanSession, SessionEvent};
