//! Event sink: the controller side of the bounded event channel.
//!
//! The transport layer owns the receiving end and serializes each event
//! to an SSE frame. The sink latches closed when the receiver goes away
//! (client disconnect) and after the terminal `close` event; writes after
//! either are idempotent no-ops, never errors.

use tokio::sync::mpsc;
use tracing::debug;

use super::events::DownloadEvent;

/// Default channel capacity; small enough that a stalled client applies
/// backpressure to the controller instead of buffering a whole book.
pub const DEFAULT_EVENT_CAPACITY: usize = 32;

/// Controller-side handle of the event channel.
#[derive(Debug)]
pub struct EventSink {
    tx: mpsc::Sender<DownloadEvent>,
    disconnected: bool,
    close_sent: bool,
}

impl EventSink {
    /// Creates a sink and its transport-side receiver.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<DownloadEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                disconnected: false,
                close_sent: false,
            },
            rx,
        )
    }

    /// Emits one event.
    ///
    /// No-op once the terminal `close` has been sent. A failed send
    /// (receiver dropped) latches the sink disconnected; subsequent
    /// emits are no-ops rather than errors.
    pub async fn emit(&mut self, event: DownloadEvent) {
        if self.close_sent {
            return;
        }
        if matches!(event, DownloadEvent::Close) {
            self.close_sent = true;
        } else if self.disconnected {
            return;
        }
        if self.disconnected {
            // Terminal close with nobody listening: nothing to deliver.
            return;
        }
        if self.tx.send(event).await.is_err() {
            self.disconnected = true;
            debug!("event stream receiver dropped, sink latched closed");
        }
    }

    /// Whether the transport side has gone away.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Whether the terminal `close` event has been emitted.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.close_sent
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_pass_through_in_order() {
        let (mut sink, mut rx) = EventSink::channel(8);
        sink.emit(DownloadEvent::Complete).await;
        sink.emit(DownloadEvent::Close).await;

        assert!(matches!(rx.recv().await.unwrap(), DownloadEvent::Complete));
        assert!(matches!(rx.recv().await.unwrap(), DownloadEvent::Close));
        // Sender side is still alive but closed; nothing further arrives.
        assert!(sink.is_closed());
    }

    #[tokio::test]
    async fn test_emit_after_close_is_noop() {
        let (mut sink, mut rx) = EventSink::channel(8);
        sink.emit(DownloadEvent::Close).await;
        sink.emit(DownloadEvent::Complete).await;
        sink.emit(DownloadEvent::Close).await;

        assert!(matches!(rx.recv().await.unwrap(), DownloadEvent::Close));
        drop(sink);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_receiver_drop_latches_disconnected() {
        let (mut sink, rx) = EventSink::channel(8);
        drop(rx);

        sink.emit(DownloadEvent::Complete).await;
        assert!(sink.is_disconnected());
        assert!(!sink.is_closed());

        // Still no panic or error on further writes.
        sink.emit(DownloadEvent::Close).await;
        assert!(sink.is_closed());
    }
}
