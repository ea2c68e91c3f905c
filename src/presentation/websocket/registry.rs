//! Connection Registry
//!
//! Process-wide table of live WebSocket connections keyed by thread and user.
//! One handle per (thread, user): a second connect replaces the first entry.
//!
//! All map access happens under a single lock that is held only while the
//! map is read or mutated. Frames are handed to connection channels after the
//! lock is released, so a slow client never stalls registration.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::messages::ServerEvent;
use crate::infrastructure::metrics;

/// A frame queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Serialized event text.
    Event(Utf8Bytes),
    /// Close the connection with the given code and reason.
    Close { code: u16, reason: String },
}

/// Sending side of one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: Uuid,
    sender: mpsc::UnboundedSender<OutboundFrame>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::UnboundedSender<OutboundFrame>) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            sender,
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Queue a frame. Returns false if the connection's writer is gone.
    pub fn send(&self, frame: OutboundFrame) -> bool {
        self.sender.send(frame).is_ok()
    }

    /// Serialize and queue a single event for this connection only.
    pub fn send_event(&self, event: &ServerEvent) -> bool {
        match event.to_text() {
            Ok(text) => self.send(OutboundFrame::Event(text)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize event");
                false
            }
        }
    }
}

type ThreadConnections = HashMap<i64, HashMap<i64, ConnectionHandle>>;

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    threads: Mutex<ThreadConnections>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` for (thread, user), returning the handle it replaced.
    ///
    /// The replaced connection is not closed; it only stops receiving
    /// broadcasts for this thread.
    pub fn connect(
        &self,
        thread_id: i64,
        user_id: i64,
        handle: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        let connection_id = handle.connection_id;
        let (evicted, total) = {
            let mut threads = self.threads.lock();
            let evicted = threads.entry(thread_id).or_default().insert(user_id, handle);
            (evicted, count(&threads))
        };

        metrics::set_websocket_connections(total);
        match &evicted {
            Some(old) => tracing::debug!(
                thread_id,
                user_id,
                %connection_id,
                evicted = %old.connection_id,
                "Connection replaced"
            ),
            None => tracing::debug!(thread_id, user_id, %connection_id, "Connection registered"),
        }

        evicted
    }

    /// Register and return a guard that deregisters on drop.
    pub fn connect_scoped(
        self: &Arc<Self>,
        thread_id: i64,
        user_id: i64,
        handle: ConnectionHandle,
    ) -> Registration {
        let connection_id = handle.connection_id;
        self.connect(thread_id, user_id, handle);
        Registration {
            registry: Arc::clone(self),
            thread_id,
            user_id,
            connection_id,
        }
    }

    /// Remove the entry for (thread, user) if present. Idempotent.
    pub fn disconnect(&self, thread_id: i64, user_id: i64) -> Option<ConnectionHandle> {
        self.remove_where(thread_id, user_id, |_| true)
    }

    /// Remove the entry only if it still belongs to `connection_id`.
    fn disconnect_connection(&self, thread_id: i64, user_id: i64, connection_id: Uuid) -> bool {
        self.remove_where(thread_id, user_id, |h| h.connection_id == connection_id)
            .is_some()
    }

    fn remove_where(
        &self,
        thread_id: i64,
        user_id: i64,
        matches: impl Fn(&ConnectionHandle) -> bool,
    ) -> Option<ConnectionHandle> {
        let (removed, total) = {
            let mut threads = self.threads.lock();
            let Some(users) = threads.get_mut(&thread_id) else {
                return None;
            };
            if !users.get(&user_id).map(&matches).unwrap_or(false) {
                return None;
            }
            let removed = users.remove(&user_id);
            if users.is_empty() {
                threads.remove(&thread_id);
            }
            (removed, count(&threads))
        };

        metrics::set_websocket_connections(total);
        if let Some(handle) = &removed {
            tracing::debug!(
                thread_id,
                user_id,
                connection_id = %handle.connection_id,
                "Connection deregistered"
            );
        }
        removed
    }

    /// Deliver `event` to every connection of the thread.
    ///
    /// Delivery is fire-and-forget: a failed send is not retried and does not
    /// stop delivery to the others. Connections whose send failed are pruned.
    /// Returns the number of connections the event was handed to.
    pub fn broadcast(&self, thread_id: i64, event: &ServerEvent) -> usize {
        let text = match event.to_text() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(thread_id, error = %e, "Failed to serialize event");
                return 0;
            }
        };

        let targets: Vec<(i64, ConnectionHandle)> = {
            let threads = self.threads.lock();
            match threads.get(&thread_id) {
                Some(users) => users.iter().map(|(u, h)| (*u, h.clone())).collect(),
                None => Vec::new(),
            }
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (user_id, handle) in targets {
            if handle.send(OutboundFrame::Event(text.clone())) {
                delivered += 1;
            } else {
                failed.push((user_id, handle.connection_id));
            }
        }

        for (user_id, connection_id) in &failed {
            tracing::debug!(thread_id, user_id, %connection_id, "Dropping dead connection");
            self.disconnect_connection(thread_id, *user_id, *connection_id);
        }

        metrics::record_broadcast(event.name(), failed.len());
        tracing::trace!(thread_id, event = event.name(), delivered, "Event broadcast");
        delivered
    }

    /// Connections registered for a thread.
    pub fn connection_count(&self, thread_id: i64) -> usize {
        self.threads
            .lock()
            .get(&thread_id)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Connections registered across all threads.
    pub fn total_connections(&self) -> usize {
        count(&self.threads.lock())
    }

    /// Threads with at least one connection.
    pub fn thread_count(&self) -> usize {
        self.threads.lock().len()
    }

    pub fn is_connected(&self, thread_id: i64, user_id: i64) -> bool {
        self.threads
            .lock()
            .get(&thread_id)
            .map(|users| users.contains_key(&user_id))
            .unwrap_or(false)
    }
}

fn count(threads: &ThreadConnections) -> usize {
    threads.values().map(HashMap::len).sum()
}

/// Registry entry owned by one connection.
///
/// Dropping it removes the entry unless a newer connection of the same user
/// has replaced it in the meantime.
#[derive(Debug)]
pub struct Registration {
    registry: Arc<ConnectionRegistry>,
    thread_id: i64,
    user_id: i64,
    connection_id: Uuid,
}

impl Registration {
    pub fn thread_id(&self) -> i64 {
        self.thread_id
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry
            .disconnect_connection(self.thread_id, self.user_id, self.connection_id);
    }
}
