//! # Core Module
//!
//! The presentation-agnostic merge engine.
//!
//! ## Modules
//! - `classifier` - Maps paths to media kinds and target subdirectories
//! - `fingerprint` - Byte-level and decoded-pixel content digests
//! - `index` - Persistent fingerprint -> kept-record mapping
//! - `scanner` - Lazy tree walking with protected-subtree pruning
//! - `reconciler` - The copy/replace/skip decision core
//! - `report` - Per-task and aggregated counters
//! - `runner` - Sequential task execution and index lifecycle

pub mod classifier;
pub mod fingerprint;
pub mod index;
pub mod reconciler;
pub mod report;
pub mod runner;
pub mod scanner;

// Re-export commonly used types
pub use classifier::MediaKind;
pub use fingerprint::MatchMode;
pub use index::FileRecord;
pub use report::{RunCounters, RunReport, TaskReport};
pub use runner::{Task, TaskRunner};
