//! Broadcast target resolution: a message sent to a room reaches only that
//! room's members, never a client sitting in a different namespace.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde_json::json;
use sockeon::{
    broadcast::{broadcast_event, Target},
    membership::Store,
    registry::{ClientId, ClientType, Connection, Registry},
};

fn addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9000)
}

fn connected_ws_client(registry: &mut Registry<()>, membership: &mut Store, id: ClientId, namespace: &str, room: Option<&str>) {
    let mut connection = Connection::new((), addr(), 16, 1024 * 1024);
    connection.client_type = ClientType::Ws;
    connection.handshake_done = true;
    registry.insert(id, connection);

    membership.register(id);
    membership.join_namespace(id, namespace);
    if let Some(room) = room {
        membership.join_room(id, room);
    }
}

#[test]
fn only_the_targeted_room_receives_the_broadcast() {
    let mut registry: Registry<()> = Registry::new();
    let mut membership = Store::new();

    let a = ClientId::from_raw(1);
    let b = ClientId::from_raw(2);
    let c = ClientId::from_raw(3);

    connected_ws_client(&mut registry, &mut membership, a, "/admin", Some("ops"));
    connected_ws_client(&mut registry, &mut membership, b, "/admin", Some("ops"));
    connected_ws_client(&mut registry, &mut membership, c, "/user", None);

    let target = Target::room("/admin", "ops");
    let delivered = broadcast_event(&mut registry, &membership, &target, "msg", &json!({"text": "hi"})).unwrap();
    assert_eq!(delivered, 2);

    assert!(!registry.get(a).unwrap().outbound.is_empty());
    assert!(!registry.get(b).unwrap().outbound.is_empty());
    assert!(registry.get(c).unwrap().outbound.is_empty());
}

#[test]
fn namespace_target_without_a_room_reaches_every_member() {
    let mut registry: Registry<()> = Registry::new();
    let mut membership = Store::new();

    let a = ClientId::from_raw(1);
    let b = ClientId::from_raw(2);

    connected_ws_client(&mut registry, &mut membership, a, "/admin", Some("ops"));
    connected_ws_client(&mut registry, &mut membership, b, "/admin", None);

    let delivered =
        broadcast_event(&mut registry, &membership, &Target::Namespace("/admin".to_string()), "msg", &json!(null)).unwrap();
    assert_eq!(delivered, 2);
}

#[test]
fn a_client_who_never_completed_the_handshake_is_skipped() {
    let mut registry: Registry<()> = Registry::new();
    let mut membership = Store::new();

    let id = ClientId::from_raw(1);
    let mut connection = Connection::new((), addr(), 16, 1024 * 1024);
    connection.client_type = ClientType::Ws;
    connection.handshake_done = false;
    registry.insert(id, connection);
    membership.register(id);

    let delivered =
        broadcast_event(&mut registry, &membership, &Target::All, "msg", &json!(null)).unwrap();
    assert_eq!(delivered, 0);
}
