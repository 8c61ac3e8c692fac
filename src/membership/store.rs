//! The membership store: namespaces and rooms, indexed both ways for O(1)
//! broadcast-target resolution and O(1) per-client cleanup.

use std::collections::{HashMap, HashSet};

use super::ROOT_NAMESPACE;
use crate::registry::ClientId;

type Room = (String, String);

/// Tracks which namespace each client belongs to and which rooms they've joined.
#[derive(Debug, Default)]
pub struct Store {
    namespace_members: HashMap<String, HashSet<ClientId>>,
    client_namespace: HashMap<ClientId, String>,
    room_members: HashMap<Room, HashSet<ClientId>>,
    client_rooms: HashMap<ClientId, HashSet<Room>>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly connected client into the root namespace.
    pub fn register(&mut self, client: ClientId) {
        self.join_namespace(client, ROOT_NAMESPACE);
    }

    /// The namespace `client` currently belongs to, if registered.
    pub fn namespace_of(&self, client: ClientId) -> Option<&str> {
        self.client_namespace.get(&client).map(String::as_str)
    }

    /// Move `client` into `namespace`, implicitly leaving its previous
    /// namespace's membership and every room it had joined.
    pub fn join_namespace(&mut self, client: ClientId, namespace: &str) {
        self.leave_rooms(client);

        if let Some(old) = self.client_namespace.remove(&client) {
            if let Some(members) = self.namespace_members.get_mut(&old) {
                members.remove(&client);
            }
        }

        self.namespace_members.entry(namespace.to_string()).or_default().insert(client);
        self.client_namespace.insert(client, namespace.to_string());
    }

    /// Join `room` within `client`'s current namespace.
    pub fn join_room(&mut self, client: ClientId, room: &str) {
        let Some(namespace) = self.namespace_of(client).map(str::to_string) else { return };
        let key = (namespace, room.to_string());

        self.room_members.entry(key.clone()).or_default().insert(client);
        self.client_rooms.entry(client).or_default().insert(key);
    }

    /// Leave `room` within `client`'s current namespace.
    pub fn leave_room(&mut self, client: ClientId, room: &str) {
        let Some(namespace) = self.namespace_of(client).map(str::to_string) else { return };
        let key = (namespace, room.to_string());

        if let Some(members) = self.room_members.get_mut(&key) {
            members.remove(&client);
        }
        if let Some(rooms) = self.client_rooms.get_mut(&client) {
            rooms.remove(&key);
        }
    }

    /// Leave every room `client` has joined, without changing its namespace.
    pub fn leave_rooms(&mut self, client: ClientId) {
        if let Some(rooms) = self.client_rooms.remove(&client) {
            for room in rooms {
                if let Some(members) = self.room_members.get_mut(&room) {
                    members.remove(&client);
                }
            }
        }
    }

    /// All clients currently in `namespace`.
    pub fn namespace_members(&self, namespace: &str) -> impl Iterator<Item = ClientId> + '_ {
        self.namespace_members.get(namespace).into_iter().flatten().copied()
    }

    /// All clients currently in `room` within `namespace`.
    pub fn room_members(&self, namespace: &str, room: &str) -> impl Iterator<Item = ClientId> + '_ {
        self.room_members.get(&(namespace.to_string(), room.to_string())).into_iter().flatten().copied()
    }

    /// The rooms `client` currently belongs to, as `(namespace, room)` pairs.
    pub fn rooms_for(&self, client: ClientId) -> impl Iterator<Item = &(String, String)> {
        self.client_rooms.get(&client).into_iter().flatten()
    }

    /// Remove every trace of `client`: namespace membership and all rooms.
    /// Safe to call more than once or for an unknown client.
    pub fn cleanup(&mut self, client: ClientId) {
        self.leave_rooms(client);

        if let Some(namespace) = self.client_namespace.remove(&client) {
            if let Some(members) = self.namespace_members.get_mut(&namespace) {
                members.remove(&client);
            }
        }
    }
}
