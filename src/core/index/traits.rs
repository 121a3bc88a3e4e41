//! Duplicate index trait definition.

use super::{FileRecord, IndexKey};
use crate::error::IndexError;

/// Trait for duplicate index backends.
///
/// Not thread-safe by contract: the reconciliation engine serializes
/// all access for a given task, so backends only need interior
/// mutability, not concurrent-writer correctness.
pub trait DuplicateIndex: Send {
    /// Look up the kept record for a fingerprint key
    fn lookup(&self, key: &IndexKey) -> Result<Option<FileRecord>, IndexError>;

    /// Unconditional upsert of the kept record for a key
    fn put(&self, key: &IndexKey, record: &FileRecord) -> Result<(), IndexError>;

    /// Remove the entry for a key, if any
    fn remove(&self, key: &IndexKey) -> Result<(), IndexError>;

    /// Number of entries currently held
    fn len(&self) -> Result<usize, IndexError>;

    fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }

    /// Register a record under all of its fingerprint keys
    fn insert_record(&self, record: &FileRecord) -> Result<(), IndexError> {
        for key in record.keys() {
            self.put(&key, record)?;
        }
        Ok(())
    }

    /// Remove a superseded record from all of its fingerprint keys
    fn remove_record(&self, record: &FileRecord) -> Result<(), IndexError> {
        for key in record.keys() {
            self.remove(&key)?;
        }
        Ok(())
    }
}
