//! WebSocket session loop for one realtime client.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use super::connection::Connection;
use super::server::{RealtimeServer, ServerFrame};

pub async fn serve_connection(socket: WebSocket, server: Arc<RealtimeServer>) {
    let (conn, mut outbox) = server.register().await;
    let (mut sink, mut stream) = socket.split();

    queue_frame(
        &conn,
        &ServerFrame::Connected {
            connection_id: conn.id,
        },
    );

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            if sink.send(Message::Text(frame.as_str().to_owned())).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                queue_frame(&conn, &server.handle_frame(&conn, &text));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(conn_id = %conn.id, error = %e, "websocket read failed");
                break;
            }
        }
    }

    server.remove(conn.id).await;
    writer.abort();
}

/// Queue a direct reply for `conn`, warning when its outbox rejects it.
fn queue_frame(conn: &Connection, frame: &ServerFrame) -> bool {
    let Some(json) = frame.to_json() else {
        return false;
    };
    if conn.send(json) {
        true
    } else {
        warn!(conn_id = %conn.id, ?frame, "failed to queue reply for client");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn queue_frame_delivers_serialized_reply() {
        let (tx, mut rx) = mpsc::channel(2);
        let conn = Connection::new(tx);

        assert!(queue_frame(&conn, &ServerFrame::Pong));
        assert_eq!(rx.recv().await.unwrap().as_str(), r#"{"type":"pong"}"#);
    }

    #[test]
    fn queue_frame_reports_full_outbox() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = Connection::new(tx);

        assert!(queue_frame(&conn, &ServerFrame::Pong));
        assert!(!queue_frame(
            &conn,
            &ServerFrame::Subscribed {
                channel: "clients".to_string()
            }
        ));
        assert_eq!(conn.drop_count(), 1);
    }
}
