//! Where the lifecycle manager sends its events.

use tokio::sync::{broadcast, mpsc};
use wabridge_protocol::LifecycleEvent;

/// Receives every event the lifecycle manager produces.
///
/// `emit` is synchronous and must not block: it runs inside the manager's
/// task, between two session events.
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, event: LifecycleEvent);
}

/// Fan-out to every subscribed observer. Sending with no subscribers is
/// not an error; the event is dropped.
impl EventSink for broadcast::Sender<LifecycleEvent> {
    fn emit(&self, event: LifecycleEvent) {
        if self.send(event).is_err() {
            tracing::trace!("no observers subscribed, event dropped");
        }
    }
}

/// A single consumer, mostly useful in tests.
impl EventSink for mpsc::UnboundedSender<LifecycleEvent> {
    fn emit(&self, event: LifecycleEvent) {
        let _ = self.send(event);
    }
}
