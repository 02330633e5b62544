//! Realtime push channel layered over the HTTP server.
//!
//! REST handlers publish [`ChangeEvent`]s on the [`EventBus`]. The
//! [`RealtimeServer`] is created lazily, exactly once, the first time a client
//! hits `/api/socket` (or upgrades on `/api/socket/ws`). Creating it spawns
//! the subscription task that forwards bus events to every WebSocket
//! connection subscribed to the event's channel.

pub mod connection;
pub mod events;
pub mod server;
pub mod socket;

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

pub use connection::Connection;
pub use events::{ChangeEvent, ChangeKind, EventBus};
pub use server::{ClientFrame, RealtimeServer, ServerFrame, setup_subscriptions};

/// Once-only holder of the realtime server.
pub struct Realtime {
    server: OnceCell<Arc<RealtimeServer>>,
    bus: EventBus,
    outbox_capacity: usize,
}

impl Realtime {
    pub fn new(bus: EventBus, outbox_capacity: usize) -> Self {
        Self {
            server: OnceCell::new(),
            bus,
            outbox_capacity,
        }
    }

    /// Return the realtime server, starting it if needed.
    ///
    /// Concurrent first callers race on the cell; exactly one runs the
    /// initialization and sees `true`, all others wait for it and see `false`.
    pub async fn attach(&self) -> (Arc<RealtimeServer>, bool) {
        let mut started = false;
        let server = self
            .server
            .get_or_init(|| async {
                started = true;
                self.start()
            })
            .await
            .clone();
        (server, started)
    }

    fn start(&self) -> Arc<RealtimeServer> {
        let server = Arc::new(RealtimeServer::new(self.outbox_capacity));
        tokio::spawn(setup_subscriptions(server.clone(), self.bus.subscribe()));
        info!("realtime server started");
        server
    }

    pub fn is_attached(&self) -> bool {
        self.server.initialized()
    }

    pub async fn connection_count(&self) -> usize {
        match self.server.get() {
            Some(server) => server.connection_count().await,
            None => 0,
        }
    }
}
