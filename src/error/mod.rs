//! # Error Module
//!
//! Error types for the media merge engine.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Recoverable vs fatal** - per-file errors are counted and the run
//!   continues; only structural errors abort a task

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Duplicate index error: {0}")]
    Index(#[from] IndexError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while walking a file tree
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read metadata for {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while computing fingerprints
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

/// Errors from the persistent duplicate index
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to open index database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Index query failed: {0}")]
    QueryFailed(String),

    #[error("Index corruption detected at {path}. Delete this file and try again.")]
    Corrupted { path: PathBuf },
}

/// Structural errors that abort a single task
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Source root does not exist: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Target root is not writable: {path}: {reason}")]
    TargetUnwritable { path: PathBuf, reason: String },

    #[error("Could not open duplicate index for {target}: {source}")]
    IndexUnavailable {
        target: PathBuf,
        #[source]
        source: IndexError,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, MergeError>;
