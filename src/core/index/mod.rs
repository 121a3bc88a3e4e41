//! # Duplicate Index Module
//!
//! Persistent mapping from fingerprint key to the single kept file for
//! that key.
//!
//! ## Why disk-backed
//! The working set of an archival collection can be far larger than
//! RAM, so the default backend stores records in SQLite instead of an
//! in-process table. Lookups stay sub-linear and the process never has
//! to hold every record at once.
//!
//! ## Key space
//! A record is always indexed under its byte-hash key. In precise mode
//! an image record is additionally indexed under its pixel-hash key, so
//! either match path resolves to the same kept file.
//!
//! ## Backends
//! - `SqliteIndex` - persistent storage using SQLite
//! - `InMemoryIndex` - for testing

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryIndex;
pub use sqlite::SqliteIndex;
pub use traits::DuplicateIndex;

use crate::core::classifier::MediaKind;
use crate::core::fingerprint::{ContentHash, FileHash, Fingerprint};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A key the duplicate index can be queried under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKey {
    /// Raw-byte digest
    Bytes(FileHash),
    /// Decoded-pixel digest
    Pixels(ContentHash),
}

impl IndexKey {
    /// Encode the key as a tagged blob for storage.
    ///
    /// The tag byte keeps the two key families in disjoint ranges of
    /// the same column.
    pub fn to_blob(&self) -> Vec<u8> {
        match self {
            IndexKey::Bytes(hash) => {
                let mut blob = Vec::with_capacity(33);
                blob.push(0x01);
                blob.extend_from_slice(hash.as_bytes());
                blob
            }
            IndexKey::Pixels(hash) => {
                let mut blob = Vec::with_capacity(9);
                blob.push(0x02);
                blob.extend_from_slice(&hash.0.to_be_bytes());
                blob
            }
        }
    }
}

/// Descriptor for a file known to the engine.
///
/// Carries its own fingerprints so all of its index keys can be
/// recomputed when the record is superseded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute location of the kept physical file
    pub path: PathBuf,
    /// Byte length; the sole quality proxy - larger is better
    pub size: u64,
    /// Classification result
    pub kind: MediaKind,
    /// Digest of the raw bytes
    pub file_hash: FileHash,
    /// Digest of the decoded pixels, when available
    pub content_hash: Option<ContentHash>,
}

impl FileRecord {
    /// Build a record from a classified, fingerprinted candidate
    pub fn new(path: PathBuf, size: u64, kind: MediaKind, fingerprint: Fingerprint) -> Self {
        Self {
            path,
            size,
            kind,
            file_hash: fingerprint.file_hash,
            content_hash: fingerprint.content_hash,
        }
    }

    /// All index keys this record is registered under
    pub fn keys(&self) -> Vec<IndexKey> {
        let mut keys = vec![IndexKey::Bytes(self.file_hash)];
        if let Some(content) = self.content_hash {
            keys.push(IndexKey::Pixels(content));
        }
        keys
    }
}
