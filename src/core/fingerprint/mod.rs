//! # Fingerprint Module
//!
//! Computes content fingerprints for candidate files.
//!
//! ## Two digests
//! - **File hash** - blake3 over the raw bytes, streamed in fixed-size
//!   chunks so memory use is bounded regardless of file size
//! - **Content hash** - only for images in precise mode: the decoded
//!   pixels are reduced to an 8x8 grayscale average-threshold hash, so
//!   the same picture stored in different containers (jpg vs png)
//!   produces the same digest
//!
//! ## Failure behavior
//! A file that becomes unreadable mid-stream is a per-file error, never
//! fatal to the run. A corrupt or unsupported image degrades to
//! file-hash-only matching with a warning.

mod pixels;

pub use pixels::decoded_pixel_hash;

use crate::core::classifier::MediaKind;
use crate::error::FingerprintError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// Chunk size for streamed byte hashing (64 KiB)
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Matching strategy for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// File-hash matching only
    Fast,
    /// Additionally match images by decoded pixel content
    Precise,
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMode::Fast => write!(f, "fast"),
            MatchMode::Precise => write!(f, "precise"),
        }
    }
}

/// Digest of a file's raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHash(pub [u8; 32]);

impl FileHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Digest of an image's decoded pixel content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub u64);

impl ContentHash {
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

/// Fingerprint of a candidate file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    /// Digest of the raw bytes, always present
    pub file_hash: FileHash,
    /// Digest of the decoded pixels; present only for images hashed in
    /// precise mode where the decode succeeded
    pub content_hash: Option<ContentHash>,
}

/// Stream a file through blake3 in fixed-size chunks
pub fn hash_file_bytes(path: &Path) -> Result<FileHash, FingerprintError> {
    let mut file = File::open(path).map_err(|source| FingerprintError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|source| FingerprintError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(FileHash(*hasher.finalize().as_bytes()))
}

/// Compute the fingerprint for a candidate file.
///
/// The content hash is attempted only for images in precise mode; a
/// decode failure is logged and leaves it absent, so the file falls
/// back to byte-level matching.
pub fn fingerprint(
    path: &Path,
    kind: MediaKind,
    mode: MatchMode,
) -> Result<Fingerprint, FingerprintError> {
    let file_hash = hash_file_bytes(path)?;

    let content_hash = if mode == MatchMode::Precise && kind == MediaKind::Image {
        match decoded_pixel_hash(path) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "image decode failed, using file hash only");
                None
            }
        }
    } else {
        None
    };

    Ok(Fingerprint {
        file_hash,
        content_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn identical_bytes_yield_identical_hash() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.bin", b"same content");
        let b = write_file(&dir, "b.bin", b"same content");

        assert_eq!(hash_file_bytes(&a).unwrap(), hash_file_bytes(&b).unwrap());
    }

    #[test]
    fn different_bytes_yield_different_hash() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.bin", b"content one");
        let b = write_file(&dir, "b.bin", b"content two");

        assert_ne!(hash_file_bytes(&a).unwrap(), hash_file_bytes(&b).unwrap());
    }

    #[test]
    fn hashing_spans_chunk_boundaries() {
        let dir = TempDir::new().unwrap();
        // Larger than one chunk so the streaming loop runs more than once
        let big = vec![0xABu8; HASH_CHUNK_SIZE * 2 + 17];
        let a = write_file(&dir, "big_a.bin", &big);
        let b = write_file(&dir, "big_b.bin", &big);

        assert_eq!(hash_file_bytes(&a).unwrap(), hash_file_bytes(&b).unwrap());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = hash_file_bytes(Path::new("/nonexistent/file.jpg"));
        assert!(matches!(result, Err(FingerprintError::Io { .. })));
    }

    #[test]
    fn fast_mode_never_computes_content_hash() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "photo.jpg", b"not a real jpeg");

        let fp = fingerprint(&path, MediaKind::Image, MatchMode::Fast).unwrap();
        assert!(fp.content_hash.is_none());
    }

    #[test]
    fn corrupt_image_degrades_to_file_hash_only() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "broken.jpg", b"definitely not a jpeg");

        let fp = fingerprint(&path, MediaKind::Image, MatchMode::Precise).unwrap();
        assert!(fp.content_hash.is_none());
    }

    #[test]
    fn videos_get_no_content_hash_even_in_precise_mode() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "clip.mp4", b"video bytes");

        let fp = fingerprint(&path, MediaKind::Video, MatchMode::Precise).unwrap();
        assert!(fp.content_hash.is_none());
    }

    #[test]
    fn hex_rendering_is_stable() {
        let hash = FileHash([0xDE; 32]);
        assert_eq!(hash.to_hex().len(), 64);
        assert!(hash.to_hex().starts_with("dede"));

        let content = ContentHash(0xDEAD_BEEF);
        assert_eq!(content.to_hex(), "00000000deadbeef");
    }
}
