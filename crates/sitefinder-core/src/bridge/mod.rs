//! Message bridge to the embedded map renderer.
//!
//! Outbound traffic is fire-and-forget: [`MapBridge::send`] encodes and
//! queues a message and never waits on the renderer. Inbound traffic is
//! decoded strictly with [`InboundMessage::decode`].

mod message;
mod renderer;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, trace};

pub use message::{BridgeError, InboundMessage, OutboundMessage};
pub use renderer::RendererModel;

/// Sending half of the native → renderer channel.
///
/// Cheaply cloneable. Messages are delivered in send order.
#[derive(Debug, Clone)]
pub struct MapBridge {
    outbound: mpsc::UnboundedSender<String>,
    sent: Arc<AtomicU64>,
}

impl MapBridge {
    /// Create a bridge and the receiver the renderer host drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                outbound: tx,
                sent: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Encode and enqueue `msg`.
    ///
    /// Returns `Ok(false)` if the renderer side has gone away; that is not
    /// an error for the caller.
    pub fn send(&self, msg: &OutboundMessage) -> Result<bool, BridgeError> {
        let payload = msg.encode()?;
        trace!(kind = msg.kind(), bytes = payload.len(), "bridge send");
        if self.outbound.send(payload).is_err() {
            debug!(kind = msg.kind(), "renderer detached, dropping message");
            return Ok(false);
        }
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    /// Number of messages handed to the renderer so far.
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn is_attached(&self) -> bool {
        !self.outbound.is_closed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_order() {
        let (bridge, mut rx) = MapBridge::channel();
        bridge.send(&OutboundMessage::ClearRoute).unwrap();
        bridge
            .send(&OutboundMessage::DrawRoute { path: vec![] })
            .unwrap();

        assert_eq!(rx.try_recv().unwrap(), r#"{"type":"clear_route"}"#);
        assert_eq!(rx.try_recv().unwrap(), r#"{"type":"draw_route","path":[]}"#);
        assert_eq!(bridge.sent_count(), 2);
    }

    #[test]
    fn detached_renderer_is_not_an_error() {
        let (bridge, rx) = MapBridge::channel();
        drop(rx);
        assert!(!bridge.is_attached());
        assert!(!bridge.send(&OutboundMessage::ClearRoute).unwrap());
        assert_eq!(bridge.sent_count(), 0);
    }
}
