//! Multi-root permission walker
//!
//! Each root is scanned by its own worker thread. Workers push findings into
//! one shared channel; a completion thread joins them all and then appends
//! the single completion marker.
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │      ScanSession        │
//!                     │  - PolicyCatalog (Arc)  │
//!                     │  - FindingReceiver      │
//!                     └───────────▲─────────────┘
//!                                 │ warnings, errors, Completed
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────┴─────┐             ┌─────┴─────┐             ┌─────┴─────┐
//! │  root-0   │             │  root-1   │             │  root-N   │
//! │ RootWalker│             │ RootWalker│             │ RootWalker│
//! └───────────┘             └───────────┘             └───────────┘
//! ```

pub mod coordinator;
pub mod sink;
pub mod tree;
pub mod worker;

pub use coordinator::{scan, scan_with, ScanProgress, ScanReport, ScanSession};
pub use sink::{Finding, FindingSink, SessionEvent};
pub use tree::{walk, walk_collect, RootOutcome, RootWalker};
pub use worker::{RootWorker, WorkerStats};
