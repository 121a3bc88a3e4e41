//! Channel plumbing between the engine and a presentation layer.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Sending half handed to the engine.
///
/// Cloneable, so the runner and reconciler can emit into the same
/// stream from wherever they run.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Emit one event.
    ///
    /// A dropped receiver silently discards the event, which is what
    /// makes progress reporting optional for callers.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receiving half owned by the consumer.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event; `None` once every sender is gone
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Drain events until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Factory for connected sender/receiver pairs
pub struct EventChannel;

impl EventChannel {
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// Sender with no receiver attached, for tests and eventless runs
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}
