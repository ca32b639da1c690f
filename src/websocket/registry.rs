use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;
use crate::error::WebSocketError;
use tracing::info;

/// Outbound half of a connection: serialized text frames waiting to be written.
pub type Outbox = mpsc::UnboundedSender<String>;

/// A registered client, as seen by the relay.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    tx: Outbox,
}

impl ConnectionHandle {
    pub fn new(id: Uuid, tx: Outbox) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Closed once the session that drains this outbox has gone away.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn send(&self, frame: String) -> Result<(), WebSocketError> {
        self.tx
            .send(frame)
            .map_err(|e| WebSocketError::SendError(format!("connection {}: {}", self.id, e)))
    }
}

/// In-memory set of open connections, keyed by connection id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<Uuid, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, connection: ConnectionHandle) {
        let id = connection.id();
        self.connections.write().await.insert(id, connection);
        info!("Registered connection {}", id);
    }

    /// Returns whether the connection was still registered.
    pub async fn unregister(&self, id: &Uuid) -> bool {
        let removed = self.connections.write().await.remove(id).is_some();
        if removed {
            info!("Unregistered connection {}", id);
        }
        removed
    }

    pub async fn all_except(&self, id: &Uuid) -> Vec<ConnectionHandle> {
        self.connections
            .read()
            .await
            .values()
            .filter(|conn| conn.id() != *id)
            .cloned()
            .collect()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
