//! WebSocket connection manager.
//!
//! Tracks every connected observer and fans broadcasts out to all of them.
//! Observers are anonymous; a connection is just an id and an outgoing
//! channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, RwLock};

use super::messages::ServerMessage;

pub struct ConnectionManager {
    connections: RwLock<HashMap<usize, mpsc::Sender<ServerMessage>>>,
    next_id: AtomicUsize,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Register a new observer.
    ///
    /// Returns the connection id and a receiver for outgoing messages. The
    /// caller forwards messages from the receiver to the socket.
    pub async fn register(&self) -> (usize, mpsc::Receiver<ServerMessage>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(32);
        self.connections.write().await.insert(id, tx);
        (id, rx)
    }

    /// Unregister an observer (called on disconnect).
    pub async fn unregister(&self, id: usize) {
        self.connections.write().await.remove(&id);
    }

    /// Broadcast a message to every connected observer.
    ///
    /// Dead connections are pruned; returns how many sends failed.
    pub async fn broadcast_all(&self, message: ServerMessage) -> usize {
        let failed: Vec<usize> = {
            let conns = self.connections.read().await;
            let mut failed = Vec::new();
            for (id, sender) in conns.iter() {
                if sender.try_send(message.clone()).is_err() {
                    failed.push(*id);
                }
            }
            failed
        };

        if !failed.is_empty() {
            let mut conns = self.connections.write().await;
            for id in &failed {
                conns.remove(id);
            }
        }
        failed.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
