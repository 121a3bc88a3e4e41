//! # Events Module
//!
//! Event-driven progress reporting for the merge engine.
//!
//! ## Design
//! The engine emits structured events through channels, allowing any
//! consumer (CLI, log sink, GUI) to subscribe without the engine holding
//! global mutable state.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Merge(MergeEvent::Copied { source, dest }) => {
//!                 println!("copied {} -> {}", source.display(), dest.display());
//!             }
//!             _ => {}
//!         }
//!     }
//! });
//!
//! runner.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
