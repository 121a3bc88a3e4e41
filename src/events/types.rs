//! Event type definitions for progress reporting.

use crate::core::report::RunCounters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the merge engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Tree scanning events
    Scan(ScanEvent),
    /// Per-file reconciliation events
    Merge(MergeEvent),
    /// Task lifecycle events
    Task(TaskEvent),
}

/// Events during tree scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// A tree walk has started
    Started { root: PathBuf },
    /// A candidate file was found
    CandidateFound { path: PathBuf },
    /// An error occurred but scanning continues with siblings
    Error { path: PathBuf, message: String },
    /// The walk finished
    Completed { root: PathBuf, candidates: usize },
}

/// Events emitted for each reconciliation decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MergeEvent {
    /// A new file was copied into the target tree
    Copied { source: PathBuf, dest: PathBuf },
    /// A larger candidate superseded the kept file
    Replaced {
        path: PathBuf,
        old_size: u64,
        new_size: u64,
    },
    /// A candidate was discarded as a duplicate of the kept file
    Skipped {
        path: PathBuf,
        duplicate_of: PathBuf,
    },
    /// A superseded physical file was deleted from the target tree
    DuplicateRemoved { path: PathBuf },
    /// A per-file operation failed; the run continues
    Error { path: PathBuf, reason: String },
}

/// Task lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskEvent {
    /// A task has started
    Started {
        source_root: PathBuf,
        target_root: PathBuf,
    },
    /// The target tree was seeded into the duplicate index
    SeedCompleted { target_root: PathBuf, seeded: usize },
    /// Progress update while reconciling source candidates
    Progress(MergeProgress),
    /// The task finished (counters may be partial if a fatal error occurred)
    Completed {
        source_root: PathBuf,
        counters: RunCounters,
    },
    /// The task hit a structural error and was aborted
    Failed {
        source_root: PathBuf,
        message: String,
    },
}

/// Progress information while reconciling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeProgress {
    /// Candidates processed so far
    pub processed: usize,
    /// The file currently being processed
    pub current_path: PathBuf,
}
