//! # Broadcast Dispatcher
//!
//! Fan-out hub between the ingestion pipeline and the connected viewer
//! sessions. A delta payload is serialized exactly once per broadcast and
//! the serialized text is shared across clients via `Arc`; each client
//! receives a pointer to the same allocation over its own unbounded MPSC
//! channel.
//!
//! Delivery is best-effort: a client whose receiving task has gone away is
//! pruned during the broadcast and never fails the fan-out for the others.
//! There is no backpressure — a slow or dead viewer is dropped, not
//! throttled.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::model::ServerMessage;

/// One registered viewer session, as the dispatcher sees it.
struct ClientHandle {
    /// Unique identifier, derived from the connection.
    id: String,
    /// Sending half of the session's dedicated channel. Unbounded: sends
    /// only fail once the receiving task has dropped its end.
    sender: mpsc::UnboundedSender<Arc<str>>,
}

/// Registry of connected viewer sessions with broadcast fan-out.
#[derive(Default)]
pub struct Dispatcher {
    clients: Mutex<Vec<ClientHandle>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a viewer session and returns the receiving half of its
    /// channel. The caller's session task owns the receiver; dropping it is
    /// how a session leaves the broadcast set implicitly.
    pub fn add_client(&self, id: &str) -> mpsc::UnboundedReceiver<Arc<str>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut clients = self.clients.lock().expect("dispatcher lock poisoned");
        clients.push(ClientHandle {
            id: id.to_string(),
            sender: tx,
        });
        log::info!("Viewer '{}' registered ({} connected)", id, clients.len());
        rx
    }

    /// Deregisters a session explicitly (disconnect or teardown).
    pub fn remove_client(&self, id: &str) {
        let mut clients = self.clients.lock().expect("dispatcher lock poisoned");
        clients.retain(|c| c.id != id);
        log::info!("Viewer '{}' removed ({} connected)", id, clients.len());
    }

    /// Number of currently registered sessions.
    pub fn client_count(&self) -> usize {
        self.clients.lock().expect("dispatcher lock poisoned").len()
    }

    /// Serializes `message` once and sends it to every registered session.
    ///
    /// Sessions whose channel is closed are pruned here rather than treated
    /// as an error; they are also removed on disconnect by their own task.
    /// Returns the number of sessions the message was handed to.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let text: Arc<str> = match serde_json::to_string(message) {
            Ok(s) => s.into(),
            Err(e) => {
                log::error!("Failed to serialize broadcast payload: {}", e);
                return 0;
            }
        };

        let mut clients = self.clients.lock().expect("dispatcher lock poisoned");
        clients.retain(|client| match client.sender.send(Arc::clone(&text)) {
            Ok(_) => true,
            Err(_) => {
                log::info!("Viewer '{}' gone mid-broadcast; pruned", client.id);
                false
            }
        });
        clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RealTimeUpdate, ServerMessage};

    fn update() -> ServerMessage {
        ServerMessage::RealTimeUpdate(RealTimeUpdate {
            total_ok: 1,
            total_ng: 0,
            total_parts: 1,
            current_output: 1,
            avg_cycle_time: "10.00".to_string(),
            latest_cycle_data: None,
            ng_trend_data: None,
        })
    }

    #[tokio::test]
    async fn broadcast_skips_dead_sessions_and_delivers_to_the_rest() {
        let dispatcher = Dispatcher::new();
        let mut rx_a = dispatcher.add_client("a");
        let rx_b = dispatcher.add_client("b");
        let mut rx_c = dispatcher.add_client("c");

        // Session b disconnects before the broadcast.
        drop(rx_b);

        let delivered = dispatcher.broadcast(&update());
        assert_eq!(delivered, 2);
        assert_eq!(dispatcher.client_count(), 2);

        assert!(rx_a.recv().await.is_some());
        assert!(rx_c.recv().await.is_some());
    }

    #[tokio::test]
    async fn remove_client_stops_further_sends() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.add_client("a");
        dispatcher.remove_client("a");

        assert_eq!(dispatcher.broadcast(&update()), 0);
        // Sender half dropped on removal: channel reports closed.
        assert!(rx.recv().await.is_none());
    }
}
