//! # Reconciler Module
//!
//! The decision core: for each candidate, consult the duplicate index,
//! apply the copy/replace/skip rule, perform the file operation and
//! update index and counters.
//!
//! ## Decision rule
//! Per candidate `C` with index lookup `L`:
//! 1. No key of `C` matches -> **NEW**: copy into the kind's target
//!    subdirectory, register under all keys
//! 2. Match and `C.size > L.size` -> **BETTER**: copy `C`, delete the
//!    superseded physical file, repoint the index
//! 3. Match and `C.size <= L.size` -> **NOT_BETTER**: discard `C`
//!    (ties keep the existing file, so repeated runs never rewrite)
//!
//! ## Concurrency
//! Fingerprints for a fixed-size batch are computed in parallel with
//! rayon; all index access and file operations happen sequentially in
//! batch order, which keeps the one-kept-record-per-key invariant free
//! of races.
//!
//! ## Failure handling
//! Per-file errors (unreadable file, failed copy or delete) are
//! counted, logged and reported as events; the run continues and a
//! failed candidate never displaces the index entry of the last
//! successfully kept file.

use crate::core::fingerprint::{self, Fingerprint, MatchMode};
use crate::core::index::{DuplicateIndex, FileRecord};
use crate::core::report::RunCounters;
use crate::core::scanner::{Candidate, ScanIter, TreeScanner};
use crate::error::{FingerprintError, MergeError, ScanError};
use crate::events::{Event, EventSender, MergeEvent, MergeProgress, ScanEvent, TaskEvent};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Candidates fingerprinted per parallel batch
const FINGERPRINT_BATCH: usize = 64;

/// Reconciliation engine for one target tree
pub struct Reconciler<'a> {
    index: &'a dyn DuplicateIndex,
    target_root: &'a Path,
    mode: MatchMode,
    events: &'a EventSender,
    counters: RunCounters,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        index: &'a dyn DuplicateIndex,
        target_root: &'a Path,
        mode: MatchMode,
        events: &'a EventSender,
    ) -> Self {
        Self {
            index,
            target_root,
            mode,
            events,
            counters: RunCounters::default(),
        }
    }

    /// Counters accumulated so far
    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    /// Scan the existing target tree into the index.
    ///
    /// Every target file becomes an initial kept record. Pre-existing
    /// duplicates inside the target are resolved on the spot: the
    /// larger physical file survives, the smaller one is deleted.
    ///
    /// Returns the number of files seeded.
    pub fn seed_target(&mut self) -> Result<usize, MergeError> {
        self.events.send(Event::Scan(ScanEvent::Started {
            root: self.target_root.to_path_buf(),
        }));

        let mut scan = TreeScanner::scan(self.target_root)?;
        let mut seeded = 0usize;

        loop {
            let batch = self.next_batch(&mut scan);
            if batch.is_empty() {
                break;
            }
            for (candidate, result) in batch {
                let Some(fp) = self.unwrap_fingerprint(&candidate, result) else {
                    continue;
                };
                self.seed_one(candidate, fp);
                seeded += 1;
            }
        }

        self.events.send(Event::Scan(ScanEvent::Completed {
            root: self.target_root.to_path_buf(),
            candidates: seeded,
        }));

        Ok(seeded)
    }

    /// Stream one source tree through the decision rule
    pub fn merge_source(&mut self, source_root: &Path) -> Result<(), MergeError> {
        self.events.send(Event::Scan(ScanEvent::Started {
            root: source_root.to_path_buf(),
        }));

        let mut scan = TreeScanner::scan(source_root)?;
        let mut processed = 0usize;

        loop {
            let batch = self.next_batch(&mut scan);
            if batch.is_empty() {
                break;
            }
            for (candidate, result) in batch {
                self.counters.scanned += 1;
                processed += 1;
                self.events.send(Event::Task(TaskEvent::Progress(MergeProgress {
                    processed,
                    current_path: candidate.path.clone(),
                })));

                let Some(fp) = self.unwrap_fingerprint(&candidate, result) else {
                    continue;
                };
                self.reconcile_one(candidate, fp);
            }
        }

        self.events.send(Event::Scan(ScanEvent::Completed {
            root: source_root.to_path_buf(),
            candidates: processed,
        }));

        Ok(())
    }

    /// Pull up to one batch of candidates and fingerprint them in
    /// parallel. Scan errors are recorded here and don't end the walk.
    fn next_batch(
        &mut self,
        scan: &mut ScanIter,
    ) -> Vec<(Candidate, Result<Fingerprint, FingerprintError>)> {
        let mut batch: Vec<Candidate> = Vec::with_capacity(FINGERPRINT_BATCH);

        while batch.len() < FINGERPRINT_BATCH {
            match scan.next() {
                Some(Ok(candidate)) => {
                    self.events.send(Event::Scan(ScanEvent::CandidateFound {
                        path: candidate.path.clone(),
                    }));
                    batch.push(candidate);
                }
                Some(Err(e)) => self.record_scan_error(e),
                None => break,
            }
        }

        let mode = self.mode;
        let fingerprints: Vec<Result<Fingerprint, FingerprintError>> = batch
            .par_iter()
            .map(|c| fingerprint::fingerprint(&c.path, c.kind, mode))
            .collect();

        batch.into_iter().zip(fingerprints).collect()
    }

    fn unwrap_fingerprint(
        &mut self,
        candidate: &Candidate,
        result: Result<Fingerprint, FingerprintError>,
    ) -> Option<Fingerprint> {
        match result {
            Ok(fp) => Some(fp),
            Err(e) => {
                self.record_file_error(&candidate.path, &e.to_string());
                None
            }
        }
    }

    /// Rule-1 semantics for a file already inside the target tree
    fn seed_one(&mut self, candidate: Candidate, fp: Fingerprint) {
        let record = FileRecord::new(candidate.path, candidate.size, candidate.kind, fp);

        match self.lookup_any(&record) {
            Ok(None) => {
                if let Err(e) = self.index.insert_record(&record) {
                    self.record_file_error(&record.path, &e.to_string());
                }
            }
            Ok(Some(kept)) if record.size > kept.size => {
                // The newly seen target file is the better copy
                if self.delete_kept(&kept).is_ok() {
                    self.counters.duplicates_removed += 1;
                    if let Err(e) = self.index.insert_record(&record) {
                        self.record_file_error(&record.path, &e.to_string());
                    }
                }
            }
            Ok(Some(_)) => {
                // Smaller in-target duplicate of an already-seeded file
                match fs::remove_file(&record.path) {
                    Ok(()) => {
                        self.counters.duplicates_removed += 1;
                        self.events.send(Event::Merge(MergeEvent::DuplicateRemoved {
                            path: record.path,
                        }));
                    }
                    Err(e) => self.record_file_error(&record.path, &e.to_string()),
                }
            }
            Err(e) => self.record_file_error(&record.path, &e.to_string()),
        }
    }

    /// Apply the decision rule to one source candidate
    fn reconcile_one(&mut self, candidate: Candidate, fp: Fingerprint) {
        let record = FileRecord::new(candidate.path, candidate.size, candidate.kind, fp);

        match self.lookup_any(&record) {
            Ok(None) => self.copy_new(record),
            Ok(Some(kept)) if record.size > kept.size => self.replace_kept(record, kept),
            Ok(Some(kept)) => {
                self.counters.skipped += 1;
                self.events.send(Event::Merge(MergeEvent::Skipped {
                    path: record.path,
                    duplicate_of: kept.path,
                }));
            }
            Err(e) => self.record_file_error(&record.path, &e.to_string()),
        }
    }

    /// Check the byte key first, then the pixel key
    fn lookup_any(&self, record: &FileRecord) -> Result<Option<FileRecord>, crate::error::IndexError> {
        for key in record.keys() {
            if let Some(kept) = self.index.lookup(&key)? {
                return Ok(Some(kept));
            }
        }
        Ok(None)
    }

    /// NEW: copy the candidate into the target tree and register it
    fn copy_new(&mut self, record: FileRecord) {
        let dest = match self.copy_into_target(&record) {
            Ok(dest) => dest,
            Err(e) => {
                self.record_file_error(&record.path, &e);
                return;
            }
        };

        let source = record.path.clone();
        let kept = FileRecord {
            path: dest.clone(),
            ..record
        };

        if let Err(e) = self.index.insert_record(&kept) {
            // Roll back the copy so disk and index agree
            self.record_file_error(&kept.path, &e.to_string());
            let _ = fs::remove_file(&kept.path);
            return;
        }

        self.counters.copied += 1;
        self.events
            .send(Event::Merge(MergeEvent::Copied { source, dest }));
    }

    /// BETTER: copy the candidate, repoint the index, delete the
    /// superseded physical file
    fn replace_kept(&mut self, record: FileRecord, kept: FileRecord) {
        let dest = match self.copy_into_target(&record) {
            Ok(dest) => dest,
            Err(e) => {
                // Index untouched: later candidates still compare
                // against the last successfully kept file
                self.record_file_error(&record.path, &e);
                return;
            }
        };

        let new_kept = FileRecord {
            path: dest,
            ..record
        };

        // If the index can't be repointed, roll back the copy; the old
        // kept file stays authoritative on disk and in the index
        if let Err(e) = self.index.remove_record(&kept) {
            self.record_file_error(&kept.path, &e.to_string());
            let _ = fs::remove_file(&new_kept.path);
            return;
        }
        if let Err(e) = self.index.insert_record(&new_kept) {
            self.record_file_error(&new_kept.path, &e.to_string());
            let _ = fs::remove_file(&new_kept.path);
            return;
        }

        self.counters.replaced += 1;
        self.events.send(Event::Merge(MergeEvent::Replaced {
            path: new_kept.path.clone(),
            old_size: kept.size,
            new_size: new_kept.size,
        }));

        if self.delete_kept(&kept).is_ok() {
            self.counters.duplicates_removed += 1;
        }
    }

    /// Copy a candidate into its kind's target subdirectory under a
    /// collision-free name. Returns the destination path.
    fn copy_into_target(&self, record: &FileRecord) -> Result<PathBuf, String> {
        let dest_dir = match record.kind.subdirectory() {
            "" => self.target_root.to_path_buf(),
            sub => self.target_root.join(sub),
        };

        fs::create_dir_all(&dest_dir).map_err(|e| e.to_string())?;

        let file_name = record
            .path
            .file_name()
            .ok_or_else(|| "candidate has no file name".to_string())?;
        let dest = collision_free_name(&dest_dir, Path::new(file_name));

        fs::copy(&record.path, &dest).map_err(|e| e.to_string())?;
        Ok(dest)
    }

    /// Delete a superseded physical file from the target tree.
    ///
    /// Refuses to touch anything outside the target root; source trees
    /// are never mutated.
    fn delete_kept(&mut self, kept: &FileRecord) -> Result<(), ()> {
        if !kept.path.starts_with(self.target_root) {
            warn!(path = %kept.path.display(), "refusing to delete file outside target root");
            return Err(());
        }

        match fs::remove_file(&kept.path) {
            Ok(()) => {
                self.events.send(Event::Merge(MergeEvent::DuplicateRemoved {
                    path: kept.path.clone(),
                }));
                Ok(())
            }
            Err(e) => {
                self.record_file_error(&kept.path, &e.to_string());
                Err(())
            }
        }
    }

    fn record_scan_error(&mut self, error: ScanError) {
        let path = match &error {
            ScanError::DirectoryNotFound { path }
            | ScanError::PermissionDenied { path }
            | ScanError::ReadDirectory { path, .. }
            | ScanError::Metadata { path, .. } => path.clone(),
        };
        self.counters.errors += 1;
        warn!(path = %path.display(), error = %error, "scan error, continuing");
        self.events.send(Event::Scan(ScanEvent::Error {
            path,
            message: error.to_string(),
        }));
    }

    fn record_file_error(&mut self, path: &Path, reason: &str) {
        self.counters.errors += 1;
        warn!(path = %path.display(), reason, "per-file error, continuing");
        self.events.send(Event::Merge(MergeEvent::Error {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }));
    }
}

/// Find a free name in `dir` for `file_name`, appending `_1`, `_2`, ...
/// before the extension until no file with that name exists.
fn collision_free_name(dir: &Path, file_name: &Path) -> PathBuf {
    let first = dir.join(file_name);
    if !first.exists() {
        return first;
    }

    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file_name.extension().map(|e| e.to_string_lossy().into_owned());

    for counter in 1u32.. {
        let name = match &ext {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let path = dir.join(name);
        if !path.exists() {
            return path;
        }
    }
    unreachable!("u32 counter space exhausted");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::index::InMemoryIndex;
    use crate::events::null_sender;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        if let Some(parent) = dir.join(name).parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    fn merge(
        source: &Path,
        target: &Path,
        index: &InMemoryIndex,
        mode: MatchMode,
    ) -> RunCounters {
        let events = null_sender();
        let mut reconciler = Reconciler::new(index, target, mode, &events);
        reconciler.seed_target().unwrap();
        reconciler.merge_source(source).unwrap();
        reconciler.counters()
    }

    #[test]
    fn new_files_are_copied_into_kind_subdirectories() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        create_file(source.path(), "photo.jpg", b"image bytes");
        create_file(source.path(), "clip.mp4", b"video bytes");
        create_file(source.path(), "backup.zip", b"archive bytes");

        let index = InMemoryIndex::new();
        let counters = merge(source.path(), target.path(), &index, MatchMode::Fast);

        assert_eq!(counters.copied, 3);
        assert_eq!(counters.errors, 0);
        assert!(target.path().join("photo.jpg").exists());
        assert!(target.path().join("mp4").join("clip.mp4").exists());
        assert!(target.path().join("zip").join("backup.zip").exists());
    }

    #[test]
    fn second_run_skips_everything() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        create_file(source.path(), "a.jpg", b"content a");
        create_file(source.path(), "b.jpg", b"content b");

        let first_index = InMemoryIndex::new();
        let first = merge(source.path(), target.path(), &first_index, MatchMode::Fast);
        assert_eq!(first.copied, 2);
        assert_eq!(first.replaced, 0);

        // Fresh index, re-seeded from the target tree
        let second_index = InMemoryIndex::new();
        let second = merge(source.path(), target.path(), &second_index, MatchMode::Fast);
        assert_eq!(second.copied, 0);
        assert_eq!(second.replaced, 0);
        assert_eq!(second.skipped, 2);
    }

    #[test]
    fn byte_identical_candidate_is_skipped() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        create_file(source.path(), "x.mp4", b"same bytes");
        let kept = create_file(target.path(), "mp4/x.mp4", b"same bytes");

        let index = InMemoryIndex::new();
        let counters = merge(source.path(), target.path(), &index, MatchMode::Fast);

        assert_eq!(counters.skipped, 1);
        assert_eq!(counters.copied, 0);
        assert!(kept.exists());
        assert_eq!(fs::read(&kept).unwrap(), b"same bytes");
    }

    #[test]
    fn equal_size_tie_keeps_existing_file() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        create_file(source.path(), "copy.jpg", b"identical");
        create_file(target.path(), "orig.jpg", b"identical");

        let index = InMemoryIndex::new();
        let counters = merge(source.path(), target.path(), &index, MatchMode::Fast);

        assert_eq!(counters.skipped, 1);
        assert_eq!(counters.replaced, 0);
        assert!(target.path().join("orig.jpg").exists());
        assert!(!target.path().join("copy.jpg").exists());
    }

    #[test]
    fn larger_duplicate_replaces_and_removes_kept_file() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();

        // Same decoded pixels, different byte sizes: only the pixel
        // key can match, so this exercises the precise-mode path
        let img_small = image::ImageBuffer::from_fn(16, 16, |x, _| {
            image::Rgb([(x * 16) as u8, 0, 0])
        });
        let small = target.path().join("pic.png");
        img_small.save(&small).unwrap();

        // Same pixels in a fatter container
        let big = source.path().join("pic.bmp");
        img_small.save(&big).unwrap();
        assert!(fs::metadata(&big).unwrap().len() > fs::metadata(&small).unwrap().len());

        let index = InMemoryIndex::new();
        let counters = merge(source.path(), target.path(), &index, MatchMode::Precise);

        assert_eq!(counters.replaced, 1);
        assert_eq!(counters.duplicates_removed, 1);
        assert!(!small.exists());
        assert!(target.path().join("pic.bmp").exists());
    }

    /// Index double whose key removal always fails, for exercising the
    /// rollback path of a replacement
    struct RemoveFailsIndex {
        inner: InMemoryIndex,
    }

    impl DuplicateIndex for RemoveFailsIndex {
        fn lookup(
            &self,
            key: &crate::core::index::IndexKey,
        ) -> Result<Option<FileRecord>, crate::error::IndexError> {
            self.inner.lookup(key)
        }

        fn put(
            &self,
            key: &crate::core::index::IndexKey,
            record: &FileRecord,
        ) -> Result<(), crate::error::IndexError> {
            self.inner.put(key, record)
        }

        fn remove(
            &self,
            _key: &crate::core::index::IndexKey,
        ) -> Result<(), crate::error::IndexError> {
            Err(crate::error::IndexError::QueryFailed(
                "disk I/O error".into(),
            ))
        }

        fn len(&self) -> Result<usize, crate::error::IndexError> {
            self.inner.len()
        }
    }

    #[test]
    fn failed_index_update_rolls_back_the_new_copy() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();

        // Pixel-identical pair so the larger bmp would replace the png
        let img = image::ImageBuffer::from_fn(16, 16, |x, _| {
            image::Rgb([(x * 16) as u8, 0, 0])
        });
        let small = target.path().join("pic.png");
        img.save(&small).unwrap();
        img.save(source.path().join("pic.bmp")).unwrap();

        let index = RemoveFailsIndex {
            inner: InMemoryIndex::new(),
        };
        let events = null_sender();
        let mut reconciler =
            Reconciler::new(&index, target.path(), MatchMode::Precise, &events);
        reconciler.seed_target().unwrap();
        reconciler.merge_source(source.path()).unwrap();
        let counters = reconciler.counters();

        // The replacement was abandoned: the copy was rolled back and
        // the previously kept file is still the one on disk
        assert_eq!(counters.replaced, 0);
        assert!(counters.errors > 0);
        assert!(small.exists());
        assert!(!target.path().join("pic.bmp").exists());
    }

    #[test]
    fn coincidental_name_clash_gets_numeric_suffix() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        create_file(source.path(), "photo.jpg", b"new unrelated content");
        create_file(target.path(), "photo.jpg", b"existing different content");

        let index = InMemoryIndex::new();
        let counters = merge(source.path(), target.path(), &index, MatchMode::Fast);

        assert_eq!(counters.copied, 1);
        assert!(target.path().join("photo.jpg").exists());
        assert!(target.path().join("photo_1.jpg").exists());
    }

    #[test]
    fn seeding_removes_in_target_duplicates() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        create_file(target.path(), "keep.jpg", b"duplicate bytes");
        create_file(target.path(), "extra.jpg", b"duplicate bytes");

        let index = InMemoryIndex::new();
        let counters = merge(source.path(), target.path(), &index, MatchMode::Fast);

        assert_eq!(counters.duplicates_removed, 1);
        let survivors: Vec<_> = fs::read_dir(target.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .collect();
        assert_eq!(survivors.len(), 1);
    }

    #[test]
    fn source_files_are_never_mutated() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let a = create_file(source.path(), "a.jpg", b"content");
        let b = create_file(source.path(), "dup.jpg", b"content");

        let index = InMemoryIndex::new();
        merge(source.path(), target.path(), &index, MatchMode::Fast);

        assert!(a.exists());
        assert!(b.exists());
        assert_eq!(fs::read(&a).unwrap(), b"content");
    }

    #[test]
    fn collision_free_name_appends_counter_before_extension() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "photo.jpg", b"a");
        create_file(dir.path(), "photo_1.jpg", b"b");

        let free = collision_free_name(dir.path(), Path::new("photo.jpg"));
        assert!(free.ends_with("photo_2.jpg"));

        let fresh = collision_free_name(dir.path(), Path::new("new.jpg"));
        assert!(fresh.ends_with("new.jpg"));
    }
}
