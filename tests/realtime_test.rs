use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use project_tracker::{AppState, Config, MemoryStore, app};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    format!("ws://{addr}/api/socket/ws")
}

async fn next_frame(socket: &mut Socket) -> Value {
    loop {
        let message = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send(socket: &mut Socket, frame: Value) {
    socket.send(Message::Text(frame.to_string())).await.unwrap();
}

#[tokio::test]
async fn test_subscriber_receives_created_client() {
    let state = AppState::new(Arc::new(MemoryStore::new()), &Config::default());
    let url = spawn_server(state.clone()).await;
    let api = TestServer::new(app(state.clone())).unwrap();

    let (mut socket, _) = connect_async(url.as_str()).await.unwrap();
    let hello = next_frame(&mut socket).await;
    assert_eq!(hello["type"], "connected");
    assert!(hello["connection_id"].is_string());

    send(&mut socket, json!({"type": "subscribe", "channel": "clients"})).await;
    let ack = next_frame(&mut socket).await;
    assert_eq!(ack, json!({"type": "subscribed", "channel": "clients"}));

    api.post("/api/clients")
        .json(&json!({"name": "Acme", "email": "ops@acme.test", "phone": "555-0100", "address": null}))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let event = next_frame(&mut socket).await;
    assert_eq!(event["type"], "event");
    assert_eq!(event["channel"], "clients");
    assert_eq!(event["kind"], "created");
    assert_eq!(event["entity"], "client");
    assert_eq!(event["data"]["name"], "Acme");

    assert!(state.realtime.is_attached());
    assert_eq!(state.realtime.connection_count().await, 1);
}

#[tokio::test]
async fn test_unsubscribed_channels_are_not_delivered() {
    let state = AppState::new(Arc::new(MemoryStore::new()), &Config::default());
    let url = spawn_server(state.clone()).await;
    let api = TestServer::new(app(state)).unwrap();

    let (mut socket, _) = connect_async(url.as_str()).await.unwrap();
    next_frame(&mut socket).await;

    send(&mut socket, json!({"type": "subscribe", "channel": "users"})).await;
    next_frame(&mut socket).await;

    api.post("/api/clients")
        .json(&json!({"name": "Quiet", "email": "q@example.com", "phone": "1"}))
        .await
        .assert_status(axum::http::StatusCode::CREATED);
    api.post("/api/users")
        .json(&json!({"name": "Ada", "email": "ada@example.com"}))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    // The client event was never queued, so the user event arrives first.
    let event = next_frame(&mut socket).await;
    assert_eq!(event["channel"], "users");
    assert_eq!(event["data"]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_ping_and_invalid_frames() {
    let state = AppState::new(Arc::new(MemoryStore::new()), &Config::default());
    let url = spawn_server(state).await;

    let (mut socket, _) = connect_async(url.as_str()).await.unwrap();
    next_frame(&mut socket).await;

    send(&mut socket, json!({"type": "ping"})).await;
    assert_eq!(next_frame(&mut socket).await, json!({"type": "pong"}));

    socket
        .send(Message::Text("definitely not json".to_string()))
        .await
        .unwrap();
    let error = next_frame(&mut socket).await;
    assert_eq!(error["type"], "error");
    assert!(error["message"].as_str().unwrap().starts_with("Invalid frame"));
}

#[tokio::test]
async fn test_disconnect_unregisters_connection() {
    let state = AppState::new(Arc::new(MemoryStore::new()), &Config::default());
    let url = spawn_server(state.clone()).await;

    let (mut socket, _) = connect_async(url.as_str()).await.unwrap();
    next_frame(&mut socket).await;
    assert_eq!(state.realtime.connection_count().await, 1);

    socket.close(None).await.unwrap();
    drop(socket);

    timeout(Duration::from_secs(5), async {
        while state.realtime.connection_count().await != 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection was not removed");
}

#[tokio::test]
async fn test_project_members_hear_about_new_project() {
    let state = AppState::new(Arc::new(MemoryStore::new()), &Config::default());
    let url = spawn_server(state.clone()).await;
    let api = TestServer::new(app(state)).unwrap();

    let client: Value = api
        .post("/api/clients")
        .json(&json!({"name": "Acme", "email": "ops@acme.test", "phone": "1"}))
        .await
        .json();
    let member: Value = api
        .post("/api/users")
        .json(&json!({"name": "Ada", "email": "ada@example.com"}))
        .await
        .json();

    let (mut socket, _) = connect_async(url.as_str()).await.unwrap();
    next_frame(&mut socket).await;
    let channel = format!("user:{}", member["id"]);
    send(&mut socket, json!({"type": "subscribe", "channel": channel})).await;
    next_frame(&mut socket).await;

    api.post("/api/projects")
        .json(&json!({"name": "Website", "client_id": client["id"], "member_ids": [member["id"]]}))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let event = next_frame(&mut socket).await;
    assert_eq!(event["channel"], channel.as_str());
    assert_eq!(event["entity"], "project");
    assert_eq!(event["data"]["name"], "Website");
}
