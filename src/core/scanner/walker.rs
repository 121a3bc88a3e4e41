//! Lazy directory walking built on walkdir.

use super::Candidate;
use crate::core::classifier::{self, is_protected_dir};
use crate::error::ScanError;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, FilterEntry, IntoIter, WalkDir};

/// Keep an entry unless it is a protected directory.
///
/// The root itself is always kept so that scanning a dot-named root
/// (common with temporary directories) works.
fn keep_entry(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if !entry.file_type().is_dir() {
        return true;
    }
    entry
        .file_name()
        .to_str()
        .map(|name| !is_protected_dir(name))
        .unwrap_or(true)
}

/// Walks file trees and produces candidate sequences
pub struct TreeScanner;

impl TreeScanner {
    /// Start a lazy walk of `root`.
    ///
    /// Fails only when the root itself is missing or not a directory;
    /// everything below that is reported per-item.
    pub fn scan(root: &Path) -> Result<ScanIter, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(keep_entry as fn(&DirEntry) -> bool);

        Ok(ScanIter {
            root: root.to_path_buf(),
            inner: walker,
        })
    }
}

/// Lazy sequence of candidates from one tree walk
pub struct ScanIter {
    root: PathBuf,
    inner: FilterEntry<IntoIter, fn(&DirEntry) -> bool>,
}

impl ScanIter {
    fn classify_entry(&self, entry: &DirEntry) -> Option<Candidate> {
        // Classify on the path relative to the root so markers in the
        // root's own ancestry don't disqualify the whole tree
        let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
        let kind = classifier::classify(relative)?;

        Some(Candidate {
            path: entry.path().to_path_buf(),
            size: 0,
            kind,
        })
    }
}

impl Iterator for ScanIter {
    type Item = Result<Candidate, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    let error = if e.io_error().map(|io| io.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path }
                    } else {
                        ScanError::ReadDirectory {
                            path: path.clone(),
                            source: std::io::Error::other(e.to_string()),
                        }
                    };
                    return Some(Err(error));
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(mut candidate) = self.classify_entry(&entry) else {
                continue;
            };

            match entry.metadata() {
                Ok(metadata) => {
                    candidate.size = metadata.len();
                    return Some(Ok(candidate));
                }
                Err(e) => {
                    return Some(Err(ScanError::Metadata {
                        path: entry.path().to_path_buf(),
                        source: std::io::Error::other(e.to_string()),
                    }));
                }
            }
        }
    }
}
