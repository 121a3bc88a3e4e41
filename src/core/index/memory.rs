//! In-memory duplicate index backend for testing.

use super::{DuplicateIndex, FileRecord, IndexKey};
use crate::error::IndexError;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory duplicate index
///
/// Useful for tests and small one-off runs where persistence isn't
/// needed. Carries none of the RAM-independence guarantees of the
/// SQLite backend.
pub struct InMemoryIndex {
    entries: RwLock<HashMap<IndexKey, FileRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl DuplicateIndex for InMemoryIndex {
    fn lookup(&self, key: &IndexKey) -> Result<Option<FileRecord>, IndexError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| IndexError::QueryFailed("poisoned lock".into()))?;

        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &IndexKey, record: &FileRecord) -> Result<(), IndexError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| IndexError::QueryFailed("poisoned lock".into()))?;

        entries.insert(*key, record.clone());
        Ok(())
    }

    fn remove(&self, key: &IndexKey) -> Result<(), IndexError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| IndexError::QueryFailed("poisoned lock".into()))?;

        entries.remove(key);
        Ok(())
    }

    fn len(&self) -> Result<usize, IndexError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| IndexError::QueryFailed("poisoned lock".into()))?;

        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::MediaKind;
    use crate::core::fingerprint::{ContentHash, FileHash, Fingerprint};
    use std::path::PathBuf;

    fn record(path: &str, size: u64, seed: u8) -> FileRecord {
        FileRecord::new(
            PathBuf::from(path),
            size,
            MediaKind::Image,
            Fingerprint {
                file_hash: FileHash([seed; 32]),
                content_hash: Some(ContentHash(seed as u64)),
            },
        )
    }

    #[test]
    fn memory_index_stores_and_retrieves() {
        let index = InMemoryIndex::new();
        let rec = record("/a.jpg", 100, 0x01);

        index.insert_record(&rec).unwrap();

        assert_eq!(
            index.lookup(&IndexKey::Bytes(rec.file_hash)).unwrap(),
            Some(rec)
        );
    }

    #[test]
    fn memory_index_remove_clears_entry() {
        let index = InMemoryIndex::new();
        let rec = record("/a.jpg", 100, 0x02);

        index.insert_record(&rec).unwrap();
        index.remove_record(&rec).unwrap();

        assert!(index.is_empty().unwrap());
    }

    #[test]
    fn memory_index_upsert_overwrites() {
        let index = InMemoryIndex::new();
        let old = record("/old.jpg", 100, 0x03);
        let new = FileRecord {
            path: PathBuf::from("/new.jpg"),
            size: 200,
            ..old.clone()
        };

        index.insert_record(&old).unwrap();
        index.insert_record(&new).unwrap();

        let kept = index
            .lookup(&IndexKey::Bytes(old.file_hash))
            .unwrap()
            .unwrap();
        assert_eq!(kept.size, 200);
    }
}
