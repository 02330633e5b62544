//! Realtime client connection state.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A connected WebSocket client and the channels it listens to.
pub struct Connection {
    pub id: Uuid,
    channels: Mutex<HashSet<String>>,
    /// Outbox drained by the socket's write task.
    tx: mpsc::Sender<Arc<String>>,
    dropped_messages: AtomicU64,
}

impl Connection {
    pub fn new(tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            channels: Mutex::new(HashSet::new()),
            tx,
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Returns `false` if the channel was already subscribed.
    pub fn subscribe(&self, channel: &str) -> bool {
        self.channels.lock().insert(channel.to_string())
    }

    /// Returns `false` if the channel was not subscribed.
    pub fn unsubscribe(&self, channel: &str) -> bool {
        self.channels.lock().remove(channel)
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.channels.lock().contains(channel)
    }

    /// Queue a text frame without waiting.
    ///
    /// Returns `false` and counts a drop if the outbox is full or closed.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_is_idempotent() {
        let (tx, _rx) = mpsc::channel(4);
        let conn = Connection::new(tx);
        assert!(conn.subscribe("clients"));
        assert!(!conn.subscribe("clients"));
        assert!(conn.is_subscribed("clients"));
        assert!(conn.unsubscribe("clients"));
        assert!(!conn.unsubscribe("clients"));
        assert!(!conn.is_subscribed("clients"));
    }

    #[tokio::test]
    async fn send_delivers_to_outbox() {
        let (tx, mut rx) = mpsc::channel(4);
        let conn = Connection::new(tx);
        assert!(conn.send(Arc::new("hello".to_string())));
        assert_eq!(rx.recv().await.unwrap().as_str(), "hello");
    }

    #[test]
    fn full_outbox_counts_drops() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = Connection::new(tx);
        assert!(conn.send(Arc::new("a".to_string())));
        assert!(!conn.send(Arc::new("b".to_string())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn closed_outbox_counts_drops() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let conn = Connection::new(tx);
        assert!(!conn.send(Arc::new("a".to_string())));
        assert_eq!(conn.drop_count(), 1);
    }
}
