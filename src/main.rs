//! # media-merge CLI
//!
//! Command-line entry point for the deduplicating media merger.
//!
//! ## Usage
//! ```bash
//! media-merge merge --source ~/incoming --target /archive/photos
//! media-merge merge -s /mnt/a /mnt/b -t /archive --fast --output json
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    media_merge::init_tracing();

    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
