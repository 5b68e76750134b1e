//! In-memory device registry for realtime fan-out.
//!
//! A user may hold several live sockets (devices) at once; events address
//! either every device of one user or every member of a game room. Rooms
//! are keyed by game code.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// A named event with a JSON payload, serialized once per send.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub event: String,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn to_message(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

struct DeviceConnection {
    user_id: String,
    tx: mpsc::Sender<String>,
}

#[derive(Default)]
struct Inner {
    /// conn_id -> connection.
    connections: HashMap<String, DeviceConnection>,
    /// user_id -> conn_ids.
    users: HashMap<String, HashSet<String>>,
    /// game code -> conn_ids.
    rooms: HashMap<String, HashSet<String>>,
}

/// Thread-safe registry of connected devices.
#[derive(Clone)]
pub struct DeviceRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Register an authenticated device. Returns the connection id.
    pub async fn register(&self, user_id: &str, tx: mpsc::Sender<String>) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();
        let mut inner = self.inner.write().await;
        inner.connections.insert(
            conn_id.clone(),
            DeviceConnection {
                user_id: user_id.to_string(),
                tx,
            },
        );
        inner
            .users
            .entry(user_id.to_string())
            .or_default()
            .insert(conn_id.clone());
        info!(user_id, conn_id = %conn_id, "Device registered");
        conn_id
    }

    /// Remove a device, detach it from every room, and return its user id.
    pub async fn unregister(&self, conn_id: &str) -> Option<String> {
        let mut inner = self.inner.write().await;
        let conn = inner.connections.remove(conn_id);
        let Some(conn) = conn else {
            warn!(conn_id, "Tried to unregister unknown device");
            return None;
        };

        if let Some(conns) = inner.users.get_mut(&conn.user_id) {
            conns.remove(conn_id);
            if conns.is_empty() {
                inner.users.remove(&conn.user_id);
            }
        }
        inner.rooms.retain(|_, members| {
            members.remove(conn_id);
            !members.is_empty()
        });

        info!(user_id = %conn.user_id, conn_id, "Device unregistered");
        Some(conn.user_id)
    }

    pub async fn join_room(&self, conn_id: &str, room: &str) {
        let mut inner = self.inner.write().await;
        if !inner.connections.contains_key(conn_id) {
            warn!(conn_id, room, "Unknown device tried to join a room");
            return;
        }
        inner
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn_id.to_string());
        debug!(conn_id, room, "Device joined room");
    }

    pub async fn leave_room(&self, conn_id: &str, room: &str) {
        let mut inner = self.inner.write().await;
        if let Some(members) = inner.rooms.get_mut(room) {
            members.remove(conn_id);
            if members.is_empty() {
                inner.rooms.remove(room);
            }
        }
    }

    /// Send an event to every device of one user. Returns devices reached.
    pub async fn emit_to_user(&self, user_id: &str, event: &Event) -> usize {
        let message = event.to_message();
        let inner = self.inner.read().await;
        let Some(conns) = inner.users.get(user_id) else {
            return 0;
        };
        let mut sent = 0;
        for conn_id in conns {
            if let Some(conn) = inner.connections.get(conn_id) {
                if conn.tx.try_send(message.clone()).is_ok() {
                    sent += 1;
                }
            }
        }
        sent
    }

    /// Send an event to every member of a room, optionally skipping one
    /// connection (the sender). Returns devices reached.
    pub async fn emit_to_room(&self, room: &str, event: &Event, except: Option<&str>) -> usize {
        let message = event.to_message();
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(room) else {
            return 0;
        };
        let mut sent = 0;
        for conn_id in members {
            if except == Some(conn_id.as_str()) {
                continue;
            }
            if let Some(conn) = inner.connections.get(conn_id) {
                if conn.tx.try_send(message.clone()).is_ok() {
                    sent += 1;
                }
            }
        }
        sent
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        self.inner.read().await.users.contains_key(user_id)
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
