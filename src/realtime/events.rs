//! Change events published by the REST handlers and the bus that carries them.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub const CLIENTS: &str = "clients";
pub const PROJECTS: &str = "projects";
pub const USERS: &str = "users";

pub fn client_channel(id: i32) -> String {
    format!("client:{id}")
}

pub fn project_channel(id: i32) -> String {
    format!("project:{id}")
}

pub fn user_channel(id: i32) -> String {
    format!("user:{id}")
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
}

/// A row change fanned out to realtime subscribers of `channel`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub channel: String,
    pub kind: ChangeKind,
    pub entity: String,
    pub data: Value,
    /// RFC 3339, UTC, millisecond precision
    pub timestamp: String,
}

impl ChangeEvent {
    pub fn created(channel: impl Into<String>, entity: &str, data: Value) -> Self {
        Self {
            channel: channel.into(),
            kind: ChangeKind::Created,
            entity: entity.to_string(),
            data,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// In-process fan-out of [`ChangeEvent`]s.
///
/// Publishing never fails from the caller's point of view: with nobody
/// listening the event is simply dropped.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of receivers the event reached.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let channel = event.channel.clone();
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(channel, receivers, "published change event");
                receivers
            }
            Err(_) => {
                debug!(channel, "no realtime listeners, change event dropped");
                0
            }
        }
    }

    /// Publish a `created` event for `row` on every channel in `channels`.
    pub fn publish_created<T: Serialize>(&self, channels: &[String], entity: &str, row: &T) {
        let data = match serde_json::to_value(row) {
            Ok(v) => v,
            Err(e) => {
                warn!(entity, error = %e, "failed to serialize change event");
                return;
            }
        };
        for channel in channels {
            self.publish(ChangeEvent::created(channel.as_str(), entity, data.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn publish_without_listeners_is_dropped() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(ChangeEvent::created(CLIENTS, "client", json!({}))), 0);
    }

    #[tokio::test]
    async fn publish_created_fans_out_per_channel() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        bus.publish_created(
            &[PROJECTS.to_string(), client_channel(7)],
            "project",
            &json!({"id": 1, "client_id": 7}),
        );

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.channel, "projects");
        assert_eq!(second.channel, "client:7");
        assert_eq!(second.entity, "project");
        assert_eq!(second.kind, ChangeKind::Created);
        assert_eq!(second.data["client_id"], 7);
    }

    #[test]
    fn event_serializes_with_snake_case_kind() {
        let event = ChangeEvent::created(user_channel(3), "time_log", json!({"id": 9}));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "created");
        assert_eq!(value["channel"], "user:3");
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
