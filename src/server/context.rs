//! The handle closures capture to act on the server from inside a route or
//! event handler.
//!
//! Handlers run on the loop thread but are required to be `Send + Sync`
//! (so they can be built once at startup and stored in the route/event
//! tables behind `Arc`). Rather than hand them a borrow of the server's
//! internals - which would mean either `Rc<RefCell<_>>` (not `Send`) or a
//! lock held across the handler call - a handler queues intents onto a
//! [`Handle`] and the event loop applies them once the handler returns.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use serde_json::Value;

use crate::{broadcast::Target, registry::ClientId};

/// One deferred action requested by a handler.
#[derive(Debug, Clone)]
pub enum Command {
    /// Encode `{event, data}` and deliver it to every client `target` resolves to.
    Broadcast { target: Target, event: String, data: Value },
    /// Move `client` into `namespace`.
    JoinNamespace { client: ClientId, namespace: String },
    /// Join `client` to `room` within its current namespace.
    JoinRoom { client: ClientId, room: String },
    /// Remove `client` from `room` within its current namespace.
    LeaveRoom { client: ClientId, room: String },
    /// Close `client`'s connection once its outbound buffer drains.
    Disconnect { client: ClientId },
    /// Stop accepting new connections and begin a cooperative shutdown.
    Shutdown,
}

/// A cheaply cloneable, non-owning reference to the running server.
#[derive(Debug, Clone, Default)]
pub struct Handle {
    commands: Arc<Mutex<VecDeque<Command>>>,
}

impl Handle {
    /// Build a fresh, empty handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a broadcast of `{event, data}` to every client `target` resolves to.
    pub fn broadcast(&self, target: Target, event: impl Into<String>, data: Value) {
        self.push(Command::Broadcast { target, event: event.into(), data });
    }

    /// Queue moving `client` into `namespace`.
    pub fn join_namespace(&self, client: ClientId, namespace: impl Into<String>) {
        self.push(Command::JoinNamespace { client, namespace: namespace.into() });
    }

    /// Queue joining `client` to `room` within its current namespace.
    pub fn join_room(&self, client: ClientId, room: impl Into<String>) {
        self.push(Command::JoinRoom { client, room: room.into() });
    }

    /// Queue removing `client` from `room`.
    pub fn leave_room(&self, client: ClientId, room: impl Into<String>) {
        self.push(Command::LeaveRoom { client, room: room.into() });
    }

    /// Queue closing `client`'s connection.
    pub fn disconnect(&self, client: ClientId) {
        self.push(Command::Disconnect { client });
    }

    /// Queue a cooperative shutdown of the whole server.
    pub fn shutdown(&self) {
        self.push(Command::Shutdown);
    }

    fn push(&self, command: Command) {
        self.lock().push_back(command);
    }

    /// Remove and return every command queued so far.
    pub(crate) fn drain(&self) -> VecDeque<Command> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Command>> {
        self.commands.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_drain_in_fifo_order() {
        let handle = Handle::new();
        handle.disconnect(ClientId::from_raw(1));
        handle.join_room(ClientId::from_raw(1), "lobby");

        let drained: Vec<_> = handle.drain().into_iter().collect();
        assert!(matches!(drained[0], Command::Disconnect { .. }));
        assert!(matches!(drained[1], Command::JoinRoom { .. }));
    }

    #[test]
    fn draining_empties_the_queue() {
        let handle = Handle::new();
        handle.shutdown();
        assert_eq!(handle.drain().len(), 1);
        assert_eq!(handle.drain().len(), 0);
    }
}
