//! Connection registry and the subscription task that feeds it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::connection::Connection;
use super::events::ChangeEvent;

/// Frames a client may send.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Ping,
}

/// Frames the server sends.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Connected { connection_id: Uuid },
    Subscribed { channel: String },
    Unsubscribed { channel: String },
    Pong,
    Error { message: String },
    Event(ChangeEvent),
}

impl ServerFrame {
    pub fn to_json(&self) -> Option<Arc<String>> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Arc::new(json)),
            Err(e) => {
                warn!(error = %e, "failed to serialize server frame");
                None
            }
        }
    }
}

/// The push server: every live WebSocket connection, indexed by id.
pub struct RealtimeServer {
    connections: RwLock<HashMap<Uuid, Arc<Connection>>>,
    outbox_capacity: usize,
}

impl RealtimeServer {
    pub fn new(outbox_capacity: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    /// Register a new connection and hand back the receiving end of its outbox.
    pub async fn register(&self) -> (Arc<Connection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(self.outbox_capacity);
        let conn = Arc::new(Connection::new(tx));
        self.connections.write().await.insert(conn.id, conn.clone());
        info!(conn_id = %conn.id, "realtime client connected");
        (conn, rx)
    }

    pub async fn remove(&self, id: Uuid) {
        if let Some(conn) = self.connections.write().await.remove(&id) {
            info!(conn_id = %id, dropped = conn.drop_count(), "realtime client disconnected");
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send `event` to every connection subscribed to its channel.
    ///
    /// Returns the number of connections the frame was queued for.
    pub async fn dispatch(&self, event: ChangeEvent) -> usize {
        let channel = event.channel.clone();
        let Some(json) = ServerFrame::Event(event).to_json() else {
            return 0;
        };

        let conns = self.connections.read().await;
        let mut delivered = 0;
        for conn in conns.values().filter(|c| c.is_subscribed(&channel)) {
            if conn.send(json.clone()) {
                delivered += 1;
            } else {
                warn!(conn_id = %conn.id, channel, "failed to queue event for client");
            }
        }
        debug!(channel, delivered, "dispatched change event");
        delivered
    }

    /// Apply one text frame from `conn` and build the reply.
    pub fn handle_frame(&self, conn: &Connection, text: &str) -> ServerFrame {
        let frame: ClientFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(conn_id = %conn.id, error = %e, "invalid realtime frame");
                return ServerFrame::Error {
                    message: format!("Invalid frame: {e}"),
                };
            }
        };

        match frame {
            ClientFrame::Subscribe { channel } => {
                if conn.subscribe(&channel) {
                    debug!(conn_id = %conn.id, channel, "subscribed");
                }
                ServerFrame::Subscribed { channel }
            }
            ClientFrame::Unsubscribe { channel } => {
                if conn.unsubscribe(&channel) {
                    debug!(conn_id = %conn.id, channel, "unsubscribed");
                }
                ServerFrame::Unsubscribed { channel }
            }
            ClientFrame::Ping => ServerFrame::Pong,
        }
    }
}

/// Forward every change on the bus to subscribed connections until the bus closes.
pub async fn setup_subscriptions(
    server: Arc<RealtimeServer>,
    mut events: broadcast::Receiver<ChangeEvent>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                server.dispatch(event).await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "realtime subscriptions lagged behind the event bus");
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!("event bus closed, stopping realtime subscriptions");
                break;
            }
        }
    }
}
