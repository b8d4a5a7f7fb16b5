//! UI event stream
//!
//! The detection loop and assistant publish status updates for the GUI and
//! tray collaborators over a bounded channel. Publishing is best-effort —
//! a closed or full channel is logged and never propagates to callers.

use tokio::sync::mpsc;

/// Channel capacity for UI events
const EVENT_CAPACITY: usize = 64;

/// Events published to the GUI/tray collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Status line update ("Say 'hey chime' to start", "Listening...")
    Status(String),

    /// Transcript of what the user said
    Heard(String),

    /// Spoken response text
    Response(String),

    /// Wake phrase detected; fired at most once per detection session
    WakeDetected,

    /// The assistant loop has stopped
    Stopped,
}

/// Best-effort sender for UI events
///
/// Cloneable; safe to call from the worker thread.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<UiEvent>,
}

impl EventSender {
    /// Create a sender/receiver pair
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<UiEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        (Self { tx }, rx)
    }

    /// Publish an event, dropping it if the receiver is gone or lagging
    pub fn send(&self, event: UiEvent) {
        if let Err(e) = self.tx.try_send(event) {
            tracing::debug!(error = %e, "ui event dropped");
        }
    }

    /// Publish a status line update
    pub fn status(&self, text: impl Into<String>) {
        self.send(UiEvent::Status(text.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_order() {
        let (tx, mut rx) = EventSender::channel();

        tx.status("ready");
        tx.send(UiEvent::WakeDetected);

        assert_eq!(rx.try_recv().unwrap(), UiEvent::Status("ready".to_string()));
        assert_eq!(rx.try_recv().unwrap(), UiEvent::WakeDetected);
    }

    #[test]
    fn send_after_receiver_dropped_does_not_panic() {
        let (tx, rx) = EventSender::channel();
        drop(rx);

        tx.send(UiEvent::Stopped);
    }
}
