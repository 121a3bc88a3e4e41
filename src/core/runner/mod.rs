//! # Runner Module
//!
//! Executes tasks strictly sequentially in caller-supplied order.
//!
//! ## Index lifecycle
//! Each target root gets its own SQLite index database under the
//! runner's index directory, created fresh at the start of the run
//! (stale files from earlier runs are removed - the index is never the
//! source of truth for file existence). The index is seeded from the
//! target tree the first time that target appears and is then reused
//! by every later task feeding the same target, so later sources see
//! duplicates introduced by earlier ones.
//!
//! ## Failure isolation
//! Structural errors (missing source root, unwritable target,
//! unopenable index) abort only the containing task; its counters are
//! reported as partial and the run continues with the next task.

use crate::core::fingerprint::MatchMode;
use crate::core::index::{DuplicateIndex, SqliteIndex};
use crate::core::reconciler::Reconciler;
use crate::core::report::{RunCounters, RunReport, TaskReport};
use crate::error::{MergeError, TaskError};
use crate::events::{null_sender, Event, EventSender, TaskEvent};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

/// One (source tree, target tree, mode) unit of work
#[derive(Debug, Clone)]
pub struct Task {
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    pub mode: MatchMode,
}

/// Runs an ordered list of tasks against their target trees
pub struct TaskRunner {
    index_dir: PathBuf,
    /// Seeded indexes keyed by canonical target root
    indexes: HashMap<PathBuf, Box<dyn DuplicateIndex>>,
}

impl TaskRunner {
    pub fn new(index_dir: PathBuf) -> Self {
        Self {
            index_dir,
            indexes: HashMap::new(),
        }
    }

    /// Run all tasks without progress reporting
    pub fn run(&mut self, tasks: &[Task]) -> RunReport {
        self.run_with_events(tasks, &null_sender())
    }

    /// Run all tasks, emitting events to the given sender
    pub fn run_with_events(&mut self, tasks: &[Task], events: &EventSender) -> RunReport {
        let mut report = RunReport::default();

        for task in tasks {
            report.push(self.run_task(task, events));
        }

        report
    }

    fn run_task(&mut self, task: &Task, events: &EventSender) -> TaskReport {
        let start = Instant::now();
        info!(
            source = %task.source_root.display(),
            target = %task.target_root.display(),
            mode = %task.mode,
            "task started"
        );
        events.send(Event::Task(TaskEvent::Started {
            source_root: task.source_root.clone(),
            target_root: task.target_root.clone(),
        }));

        let mut counters = RunCounters::default();
        let fatal_error = match self.execute(task, &mut counters, events) {
            Ok(()) => None,
            Err(e) => {
                error!(
                    source = %task.source_root.display(),
                    error = %e,
                    "task aborted"
                );
                events.send(Event::Task(TaskEvent::Failed {
                    source_root: task.source_root.clone(),
                    message: e.to_string(),
                }));
                Some(e.to_string())
            }
        };

        if fatal_error.is_none() {
            info!(
                source = %task.source_root.display(),
                %counters,
                "task completed"
            );
            events.send(Event::Task(TaskEvent::Completed {
                source_root: task.source_root.clone(),
                counters,
            }));
        }

        TaskReport {
            source_root: task.source_root.clone(),
            target_root: task.target_root.clone(),
            mode: task.mode,
            counters,
            fatal_error,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn execute(
        &mut self,
        task: &Task,
        counters: &mut RunCounters,
        events: &EventSender,
    ) -> Result<(), MergeError> {
        if !task.source_root.is_dir() {
            return Err(TaskError::SourceMissing {
                path: task.source_root.clone(),
            }
            .into());
        }

        fs::create_dir_all(&task.target_root).map_err(|e| TaskError::TargetUnwritable {
            path: task.target_root.clone(),
            reason: e.to_string(),
        })?;
        let target = task
            .target_root
            .canonicalize()
            .map_err(|e| TaskError::TargetUnwritable {
                path: task.target_root.clone(),
                reason: e.to_string(),
            })?;

        let first_time = !self.indexes.contains_key(&target);
        if first_time {
            let index = self.open_fresh_index(&target)?;
            self.indexes.insert(target.clone(), Box::new(index));
        }
        let Some(index) = self.indexes.get(&target) else {
            return Err(MergeError::Config("index cache lost its entry".into()));
        };

        let mut reconciler = Reconciler::new(index.as_ref(), &target, task.mode, events);

        if first_time {
            match reconciler.seed_target() {
                Ok(seeded) => {
                    events.send(Event::Task(TaskEvent::SeedCompleted {
                        target_root: target.clone(),
                        seeded,
                    }));
                }
                Err(e) => {
                    *counters = reconciler.counters();
                    return Err(e);
                }
            }
        }

        if let Err(e) = reconciler.merge_source(&task.source_root) {
            *counters = reconciler.counters();
            return Err(e);
        }

        *counters = reconciler.counters();
        Ok(())
    }

    /// Open the index database for a target, discarding any file left
    /// over from a previous run
    fn open_fresh_index(&self, target: &Path) -> Result<SqliteIndex, MergeError> {
        let db_path = self.index_db_path(target);

        for suffix in ["", "-wal", "-shm"] {
            let mut name = db_path.as_os_str().to_os_string();
            name.push(suffix);
            let _ = fs::remove_file(PathBuf::from(name));
        }

        SqliteIndex::open(&db_path).map_err(|source| {
            TaskError::IndexUnavailable {
                target: target.to_path_buf(),
                source,
            }
            .into()
        })
    }

    /// One database file per target root, named by a digest of the
    /// canonical target path
    fn index_db_path(&self, target: &Path) -> PathBuf {
        let digest = blake3::hash(target.to_string_lossy().as_bytes());
        let hex = digest.to_hex();
        self.index_dir.join(format!("merge-{}.db", &hex.as_str()[..16]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    fn task(source: &Path, target: &Path) -> Task {
        Task {
            source_root: source.to_path_buf(),
            target_root: target.to_path_buf(),
            mode: MatchMode::Fast,
        }
    }

    #[test]
    fn single_task_copies_all_candidates() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let index_dir = TempDir::new().unwrap();
        create_file(source.path(), "a.jpg", b"one");
        create_file(source.path(), "b.mp4", b"two");

        let mut runner = TaskRunner::new(index_dir.path().to_path_buf());
        let report = runner.run(&[task(source.path(), target.path())]);

        assert_eq!(report.totals.copied, 2);
        assert!(!report.has_fatal_errors());
    }

    #[test]
    fn later_task_sees_duplicates_from_earlier_task() {
        let source_a = TempDir::new().unwrap();
        let source_b = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let index_dir = TempDir::new().unwrap();

        create_file(source_a.path(), "first.jpg", b"shared bytes");
        create_file(source_b.path(), "second.jpg", b"shared bytes");

        let mut runner = TaskRunner::new(index_dir.path().to_path_buf());
        let report = runner.run(&[
            task(source_a.path(), target.path()),
            task(source_b.path(), target.path()),
        ]);

        assert_eq!(report.tasks[0].counters.copied, 1);
        assert_eq!(report.tasks[1].counters.copied, 0);
        assert_eq!(report.tasks[1].counters.skipped, 1);
    }

    #[test]
    fn missing_source_aborts_only_its_task() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let index_dir = TempDir::new().unwrap();
        create_file(source.path(), "a.jpg", b"content");

        let mut runner = TaskRunner::new(index_dir.path().to_path_buf());
        let report = runner.run(&[
            task(Path::new("/nonexistent/source"), target.path()),
            task(source.path(), target.path()),
        ]);

        assert!(report.tasks[0].is_fatal());
        assert!(!report.tasks[1].is_fatal());
        assert_eq!(report.tasks[1].counters.copied, 1);
    }

    #[test]
    fn index_database_is_created_under_index_dir() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let index_dir = TempDir::new().unwrap();
        create_file(source.path(), "a.jpg", b"content");

        let mut runner = TaskRunner::new(index_dir.path().to_path_buf());
        runner.run(&[task(source.path(), target.path())]);

        let db_files: Vec<_> = fs::read_dir(index_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "db").unwrap_or(false))
            .collect();
        assert_eq!(db_files.len(), 1);
    }

    #[test]
    fn stale_index_file_is_discarded() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let index_dir = TempDir::new().unwrap();
        create_file(source.path(), "a.jpg", b"content");

        let mut runner = TaskRunner::new(index_dir.path().to_path_buf());
        let canonical = target.path().canonicalize().unwrap();
        let db_path = runner.index_db_path(&canonical);
        create_file(
            db_path.parent().unwrap(),
            db_path.file_name().unwrap().to_str().unwrap(),
            b"not a sqlite database",
        );

        let report = runner.run(&[task(source.path(), target.path())]);
        assert!(!report.has_fatal_errors());
        assert_eq!(report.totals.copied, 1);
    }

    #[test]
    fn target_is_not_reseeded_for_repeat_tasks() {
        let source_a = TempDir::new().unwrap();
        let source_b = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let index_dir = TempDir::new().unwrap();

        // Target already holds a file; it is seeded once and both
        // sources compare against it
        create_file(target.path(), "kept.jpg", b"archived bytes");
        create_file(source_a.path(), "dup_a.jpg", b"archived bytes");
        create_file(source_b.path(), "dup_b.jpg", b"archived bytes");

        let mut runner = TaskRunner::new(index_dir.path().to_path_buf());
        let report = runner.run(&[
            task(source_a.path(), target.path()),
            task(source_b.path(), target.path()),
        ]);

        assert_eq!(report.totals.skipped, 2);
        assert_eq!(report.totals.copied, 0);
    }
}
