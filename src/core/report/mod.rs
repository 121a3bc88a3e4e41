//! # Report Module
//!
//! Per-task and aggregated counters for the presentation layer.
//!
//! Counters are plain values threaded through the engine and returned
//! to the caller - there is no process-wide mutable state.

use crate::core::fingerprint::MatchMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Running counters for one task (or an aggregate of tasks)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    /// Candidates that entered the engine
    pub scanned: usize,
    /// New files copied into the target tree
    pub copied: usize,
    /// Kept files superseded by a larger candidate
    pub replaced: usize,
    /// Candidates discarded as not better than the kept file
    pub skipped: usize,
    /// Physical duplicate files deleted from the target tree
    pub duplicates_removed: usize,
    /// Per-file errors recovered during the run
    pub errors: usize,
}

impl RunCounters {
    /// Fold another set of counters into this one
    pub fn merge(&mut self, other: &RunCounters) {
        self.scanned += other.scanned;
        self.copied += other.copied;
        self.replaced += other.replaced;
        self.skipped += other.skipped;
        self.duplicates_removed += other.duplicates_removed;
        self.errors += other.errors;
    }
}

impl std::fmt::Display for RunCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scanned {}, copied {}, replaced {}, skipped {}, duplicates removed {}, errors {}",
            self.scanned,
            self.copied,
            self.replaced,
            self.skipped,
            self.duplicates_removed,
            self.errors
        )
    }
}

/// Outcome of one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    pub mode: MatchMode,
    /// Counters for the task; partial if a fatal error occurred
    pub counters: RunCounters,
    /// Structural error that aborted the task, if any
    pub fatal_error: Option<String>,
    pub duration_ms: u64,
}

impl TaskReport {
    pub fn is_fatal(&self) -> bool {
        self.fatal_error.is_some()
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub tasks: Vec<TaskReport>,
    pub totals: RunCounters,
}

impl RunReport {
    /// Append a task report and fold its counters into the totals
    pub fn push(&mut self, task: TaskReport) {
        self.totals.merge(&task.counters);
        self.tasks.push(task);
    }

    /// True when at least one task hit a structural error
    pub fn has_fatal_errors(&self) -> bool {
        self.tasks.iter().any(TaskReport::is_fatal)
    }
}
