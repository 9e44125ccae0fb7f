//! Event dispatch sink
//!
//! Decoded events leave the receiver loop through this interface. The
//! consumer (a queue, an executor, a handler registry) lives with the
//! caller; submission must not block the receiver for long.

use gatewire_protocol::Event;
use tokio::sync::mpsc;

/// Consumes decoded events in receive order
pub trait EventSink: Send + Sync {
    /// Accept one event; must not block
    fn submit(&self, event: Event);
}

impl EventSink for mpsc::UnboundedSender<Event> {
    fn submit(&self, event: Event) {
        // A dropped receiver means the caller no longer wants events;
        // the connection itself stays healthy.
        if self.send(event).is_err() {
            tracing::debug!("event sink receiver dropped; event discarded");
        }
    }
}
