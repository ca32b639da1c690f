use std::sync::Arc;
use uuid::Uuid;
use tracing::{debug, error, warn};

use crate::websocket::{ConnectionRegistry, Event, NOTE_EVENT};

/// Routes inbound events: `note` goes to every other registered connection.
#[derive(Debug, Clone)]
pub struct BroadcastRelay {
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastRelay {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Handles one event received on connection `from`.
    /// Returns how many peers the frame was handed to.
    pub async fn dispatch(&self, from: Uuid, event: Event) -> usize {
        if !event.is_note() {
            debug!("Ignoring '{}' event from connection {}", event.name, from);
            return 0;
        }

        let frame = match Event::new(NOTE_EVENT, event.payload).to_text() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode note from connection {}: {}", from, e);
                return 0;
            }
        };

        let mut delivered = 0;
        for peer in self.registry.all_except(&from).await {
            if !peer.is_open() {
                warn!("Skipping closed connection {} still awaiting unregister", peer.id());
                continue;
            }
            match peer.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Dropping note for {}: {}", peer.id(), e),
            }
        }

        debug!("Relayed note from {} to {} peer(s)", from, delivered);
        delivered
    }
}
