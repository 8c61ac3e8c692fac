//! Target resolution and frame delivery.
//!
//! Mirrors the three-case resolution rule: namespace + room reaches only that
//! room's members, namespace alone reaches everyone in it, and neither
//! reaches every connected WebSocket client.

use serde_json::Value;

use crate::{
    error::Result,
    membership::Store,
    protocol::Message,
    registry::{ClientId, ClientType, Registry},
};

/// Who a broadcast should reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A single client, by id.
    Client(ClientId),
    /// Every client in `room` within `namespace`.
    Room { namespace: String, room: String },
    /// Every client in `namespace`, regardless of room membership.
    Namespace(String),
    /// Every connected WebSocket client, regardless of namespace.
    All,
}

impl Target {
    /// A room target, built from its two parts.
    pub fn room(namespace: impl Into<String>, room: impl Into<String>) -> Self {
        Self::Room { namespace: namespace.into(), room: room.into() }
    }

    /// Build a target from an optional `(namespace, room)` pair, following
    /// the broadcast dispatcher's resolution order: both present addresses a
    /// room, namespace alone addresses that namespace, neither addresses
    /// every WebSocket client.
    pub fn from_scope(namespace: Option<String>, room: Option<String>) -> Self {
        match (namespace, room) {
            (Some(namespace), Some(room)) => Self::room(namespace, room),
            (Some(namespace), None) => Self::Namespace(namespace),
            (None, _) => Self::All,
        }
    }

    fn resolve<S>(&self, registry: &Registry<S>, membership: &Store) -> Vec<ClientId> {
        match self {
            Target::Client(id) => vec![*id],
            Target::Room { namespace, room } => membership.room_members(namespace, room).collect(),
            Target::Namespace(namespace) => membership.namespace_members(namespace).collect(),
            Target::All => registry.ids().collect(),
        }
    }
}

/// Queue `message` onto the outbound buffer of every client resolved from
/// `target`, encoding it once. Clients that haven't finished the WebSocket
/// handshake (or aren't WebSocket clients at all) are skipped. Returns the
/// number of clients the message was queued for.
pub fn dispatch_message<S>(registry: &mut Registry<S>, membership: &Store, target: &Target, message: Message) -> usize {
    let mut encoded = Vec::new();
    if message.into_frame().into_buf(&mut encoded).is_err() {
        return 0;
    }

    let mut delivered = 0;
    for id in target.resolve(registry, membership) {
        if let Some(connection) = registry.get_mut(id) {
            if connection.client_type == ClientType::Ws && connection.handshake_done {
                connection.outbound.extend_from_slice(&encoded);
                delivered += 1;
            }
        }
    }
    delivered
}

/// Encode `{"event": event, "data": data}` as a single JSON text frame and
/// deliver it to every client resolved from `target`.
pub fn broadcast_event<S>(
    registry: &mut Registry<S>,
    membership: &Store,
    target: &Target,
    event: &str,
    data: &Value,
) -> Result<usize> {
    let envelope = serde_json::to_string(&serde_json::json!({ "event": event, "data": data }))?;
    Ok(dispatch_message(registry, membership, target, Message::Text(envelope)))
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use serde_json::json;

    use super::*;
    use crate::registry::Connection;

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9001)
    }

    fn ws_client(registry: &mut Registry<Vec<u8>>) -> ClientId {
        let id = registry.reserve_id();
        let mut connection = Connection::new(Vec::new(), addr(), 8, 1024);
        connection.client_type = ClientType::Ws;
        connection.handshake_done = true;
        registry.insert(id, connection);
        id
    }

    #[test]
    fn dispatch_to_a_single_client_queues_one_frame() {
        let mut registry: Registry<Vec<u8>> = Registry::new();
        let id = ws_client(&mut registry);
        let store = Store::new();

        let delivered = dispatch_message(&mut registry, &store, &Target::Client(id), Message::Text("hi".into()));

        assert_eq!(delivered, 1);
        assert!(!registry.get(id).unwrap().outbound.is_empty());
    }

    #[test]
    fn dispatch_skips_clients_that_have_not_finished_the_handshake() {
        let mut registry: Registry<Vec<u8>> = Registry::new();
        let id = registry.reserve_id();
        registry.insert(id, Connection::new(Vec::new(), addr(), 8, 1024));

        let mut store = Store::new();
        store.register(id);

        let delivered = dispatch_message(&mut registry, &store, &Target::All, Message::Ping(vec![]));

        assert_eq!(delivered, 0);
        assert!(registry.get(id).unwrap().outbound.is_empty());
    }

    #[test]
    fn dispatch_to_a_room_reaches_only_its_members() {
        let mut registry: Registry<Vec<u8>> = Registry::new();
        let a = ws_client(&mut registry);
        let b = ws_client(&mut registry);

        let mut store = Store::new();
        store.register(a);
        store.register(b);
        store.join_room(a, "lobby");

        let delivered = dispatch_message(&mut registry, &store, &Target::room("/", "lobby"), Message::Text("hey".into()));

        assert_eq!(delivered, 1);
        assert!(!registry.get(a).unwrap().outbound.is_empty());
        assert!(registry.get(b).unwrap().outbound.is_empty());
    }

    #[test]
    fn target_all_reaches_every_ws_client_regardless_of_namespace() {
        let mut registry: Registry<Vec<u8>> = Registry::new();
        let a = ws_client(&mut registry);
        let b = ws_client(&mut registry);

        let mut store = Store::new();
        store.register(a);
        store.join_namespace(b, "/admin");

        let delivered = dispatch_message(&mut registry, &store, &Target::All, Message::Text("all".into()));
        assert_eq!(delivered, 2);
    }

    #[test]
    fn broadcast_event_wraps_event_and_data_in_one_json_frame() {
        let mut registry: Registry<Vec<u8>> = Registry::new();
        let id = ws_client(&mut registry);
        let store = Store::new();

        broadcast_event(&mut registry, &store, &Target::Client(id), "chat:message", &json!({"text": "hi"})).unwrap();
        assert!(!registry.get(id).unwrap().outbound.is_empty());
    }

    #[test]
    fn from_scope_resolves_neither_to_all() {
        assert_eq!(Target::from_scope(None, None), Target::All);
        assert_eq!(Target::from_scope(None, Some("ops".into())), Target::All);
        assert_eq!(Target::from_scope(Some("/admin".into()), None), Target::Namespace("/admin".into()));
        assert_eq!(
            Target::from_scope(Some("/admin".into()), Some("ops".into())),
            Target::room("/admin", "ops")
        );
    }
}
