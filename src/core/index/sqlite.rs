//! SQLite duplicate index backend.

use super::{DuplicateIndex, FileRecord, IndexKey};
use crate::core::classifier::MediaKind;
use crate::core::fingerprint::{ContentHash, FileHash};
use crate::error::IndexError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// SQLite-backed persistent duplicate index
///
/// Uses WAL (Write-Ahead Logging) mode so index reads can proceed
/// while a write is in flight. One database holds the kept records for
/// one target tree, keyed by tagged fingerprint blobs.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteIndex {
    /// Open or create an index database at the given path
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| IndexError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| IndexError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| IndexError::QueryFailed(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kept (
                key BLOB PRIMARY KEY,
                path TEXT NOT NULL,
                size INTEGER NOT NULL,
                kind TEXT NOT NULL,
                file_hash BLOB NOT NULL,
                content_hash INTEGER
            )",
            [],
        )
        .map_err(|e| IndexError::QueryFailed(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, IndexError> {
        self.conn.lock().map_err(|_| IndexError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    fn kind_to_str(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Archive => "archive",
        }
    }

    fn str_to_kind(s: &str) -> MediaKind {
        match s {
            "video" => MediaKind::Video,
            "archive" => MediaKind::Archive,
            _ => MediaKind::Image,
        }
    }
}

impl DuplicateIndex for SqliteIndex {
    fn lookup(&self, key: &IndexKey) -> Result<Option<FileRecord>, IndexError> {
        let conn = self.lock()?;

        let record = conn
            .query_row(
                "SELECT path, size, kind, file_hash, content_hash FROM kept WHERE key = ?",
                [key.to_blob()],
                |row| {
                    let path: String = row.get(0)?;
                    let size: i64 = row.get(1)?;
                    let kind: String = row.get(2)?;
                    let file_hash: Vec<u8> = row.get(3)?;
                    let content_hash: Option<i64> = row.get(4)?;

                    // A foreign or damaged database may hold a blob of
                    // the wrong width; fail the query instead of panicking
                    let hash_bytes: [u8; 32] =
                        file_hash.as_slice().try_into().map_err(|_| {
                            rusqlite::Error::FromSqlConversionFailure(
                                3,
                                rusqlite::types::Type::Blob,
                                "file_hash blob must be 32 bytes".into(),
                            )
                        })?;

                    Ok(FileRecord {
                        path: PathBuf::from(path),
                        size: size as u64,
                        kind: Self::str_to_kind(&kind),
                        file_hash: FileHash(hash_bytes),
                        content_hash: content_hash.map(|bits| ContentHash(bits as u64)),
                    })
                },
            )
            .optional()
            .map_err(|e| IndexError::QueryFailed(e.to_string()))?;

        Ok(record)
    }

    fn put(&self, key: &IndexKey, record: &FileRecord) -> Result<(), IndexError> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR REPLACE INTO kept (key, path, size, kind, file_hash, content_hash)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                key.to_blob(),
                record.path.to_string_lossy(),
                record.size as i64,
                Self::kind_to_str(record.kind),
                record.file_hash.as_bytes().as_slice(),
                record.content_hash.map(|c| c.0 as i64),
            ],
        )
        .map_err(|e| IndexError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    fn remove(&self, key: &IndexKey) -> Result<(), IndexError> {
        let conn = self.lock()?;

        conn.execute("DELETE FROM kept WHERE key = ?", [key.to_blob()])
            .map_err(|e| IndexError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    fn len(&self) -> Result<usize, IndexError> {
        let conn = self.lock()?;

        conn.query_row("SELECT COUNT(*) FROM kept", [], |row| {
            row.get::<_, i64>(0).map(|v| v as usize)
        })
        .map_err(|e| IndexError::QueryFailed(e.to_string()))
    }
}
