//! # Scanner Module
//!
//! Walks a directory tree and yields classified candidate files as a
//! lazy sequence.
//!
//! ## Guarantees
//! - The tree is never materialized in memory; one candidate at a time
//! - Protected subtrees (thumbnail caches, recycle bins) are pruned
//!   whole, never descended
//! - Symbolic links are not followed, so cycles cannot hang the walk
//! - Permission errors on a subtree are yielded as items and the walk
//!   continues with siblings
//!
//! A `ScanIter` is not restartable; call `TreeScanner::scan` again to
//! re-walk from the root.

mod walker;

pub use walker::{ScanIter, TreeScanner};

use crate::core::classifier::MediaKind;
use std::path::PathBuf;

/// A classified file yielded by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Byte length
    pub size: u64,
    /// Media kind from the classifier
    pub kind: MediaKind,
}
