//! # Classifier Module
//!
//! Maps file paths to a media kind and a target subdirectory.
//!
//! ## Rules
//! - Classification is purely extension-based, case-insensitive
//! - A path under a protected system directory (NAS thumbnail caches,
//!   recycle bins, dot-directories) is always skipped, before the
//!   extension is even looked at
//! - Unrecognized extensions are skipped and never reach the engine
//!
//! ## Target layout
//! - Images land directly under the target root
//! - Videos land under `mp4/`
//! - Archives land under `zip/`

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Image file extensions (lower-case, without the dot)
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp", "heic", "heif",
];

/// Video file extensions
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "3gp", "mpg", "mpeg",
];

/// Archive file extensions
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"];

/// Directory names whose entire subtree is excluded from scanning.
///
/// These are NAS/OS artifacts (Synology thumbnail caches, QNAP recycle
/// bins) that can hold enormous numbers of derived files.
const PROTECTED_DIR_MARKERS: &[&str] = &["@eaDir", "@Recycle", "#recycle", ".thumbnail"];

/// Media kind recognized by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Archive,
}

impl MediaKind {
    /// Subdirectory of the target root this kind is written to.
    ///
    /// Images stay at the root, so their subdirectory is empty.
    pub fn subdirectory(&self) -> &'static str {
        match self {
            MediaKind::Image => "",
            MediaKind::Video => "mp4",
            MediaKind::Archive => "zip",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if ARCHIVE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Archive)
        } else {
            None
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Archive => write!(f, "archive"),
        }
    }
}

/// Check whether a directory name marks a protected subtree.
///
/// Dot-prefixed directories are treated as protected as well.
pub fn is_protected_dir(name: &str) -> bool {
    PROTECTED_DIR_MARKERS.contains(&name) || name.starts_with('.')
}

/// Check whether any component of a path is a protected directory
pub fn is_protected_path(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(is_protected_dir)
            .unwrap_or(false)
    })
}

/// Classify a file path into a media kind.
///
/// Returns `None` for protected paths and unrecognized extensions;
/// such files are excluded from all downstream processing. Pure
/// function of the path string, no filesystem access.
pub fn classify(path: &Path) -> Option<MediaKind> {
    if is_protected_path(path) {
        return None;
    }

    path.extension()
        .and_then(|e| e.to_str())
        .and_then(MediaKind::from_extension)
}
