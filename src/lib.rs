//! # media-merge
//!
//! Merges media source trees into target archive trees, eliminating
//! duplicates and keeping the best (largest) copy of each file.
//!
//! ## Core Behavior
//! - **Copy-only** - source trees are never mutated or deleted from
//! - **Content-addressed** - duplicates are detected by byte digest,
//!   and in precise mode also by decoded image pixels, so the same
//!   photo in different containers is recognized
//! - **RAM-independent** - the duplicate index is backed by SQLite, so
//!   collections far larger than memory still merge in one pass
//!
//! ## Architecture
//! The library is split into a core engine and a thin presentation
//! layer:
//! - `core` - scanning, fingerprinting, index, reconciliation
//! - `events` - event-driven progress reporting
//! - `error` - error taxonomy
//! - `cli` lives in the binary crate

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{MergeError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
