//! Per-connection state.

use std::{
    collections::HashMap,
    net::SocketAddr,
    time::Instant,
};

use crate::protocol::frame::Assembler;

/// Identifies one connection for the lifetime of the process. Derived from
/// the `mio::Token` assigned to its socket at accept time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    /// Build a `ClientId` from a raw `mio::Token` value.
    pub fn from_raw(token: u64) -> Self {
        Self(token)
    }

    /// The raw token value, for registering/looking up with `mio::Poll`.
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// What a connection has been recognized as, after protocol sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    /// Not yet sniffed (no bytes read, or not enough to decide).
    Unknown,
    /// Speaking plain HTTP/1.1 (no upgrade).
    Http,
    /// Upgraded to the WebSocket protocol.
    Ws,
}

/// All per-connection state the event loop and dispatch layers need.
#[derive(Debug)]
pub struct Connection<S> {
    /// The underlying stream.
    pub stream: S,
    /// The remote peer's address.
    pub peer_addr: SocketAddr,
    /// What this connection has been classified as.
    pub client_type: ClientType,
    /// Whether the WebSocket handshake has completed (meaningless for `Http`).
    pub handshake_done: bool,
    /// Bytes read from the socket but not yet fully consumed.
    pub inbound: Vec<u8>,
    /// Bytes queued to write to the socket.
    pub outbound: Vec<u8>,
    /// Fragmentation reassembly state, used once `client_type == Ws`.
    pub assembler: Assembler,
    /// Arbitrary per-connection application data (session-like storage).
    pub data: HashMap<String, serde_json::Value>,
    /// When the connection was accepted.
    pub created_at: Instant,
    /// When the connection last produced or consumed any bytes.
    pub last_active: Instant,
    /// Whether the connection has been asked to close once its outbound
    /// buffer drains (a close frame was queued, or an HTTP response with
    /// `Connection: close`).
    pub closing: bool,
}

impl<S> Connection<S> {
    /// Wrap a freshly accepted stream.
    pub fn new(stream: S, peer_addr: SocketAddr, max_continuation_frames: usize, max_message_size: usize) -> Self {
        let now = Instant::now();

        Self {
            stream,
            peer_addr,
            client_type: ClientType::Unknown,
            handshake_done: false,
            inbound: Vec::new(),
            outbound: Vec::new(),
            assembler: Assembler::new(max_continuation_frames, max_message_size),
            data: HashMap::new(),
            created_at: now,
            last_active: now,
            closing: false,
        }
    }

    /// Mark the connection as having produced or consumed bytes just now.
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }
}
