#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_must_use,
    unused_mut,
    unused_import_braces
)]
//! sockeon: a combined WebSocket + HTTP application server core.
//!
//! A single-threaded, cooperative event loop multiplexes both protocols on
//! one listening socket: the first bytes of a connection are sniffed to
//! decide whether it speaks HTTP/1.1 or wants to upgrade to a WebSocket,
//! clients are organised into namespaces and rooms for targeted broadcasts,
//! and both HTTP routes and WebSocket events are dispatched through ordered
//! middleware chains to declaratively registered handlers.
#![allow(clippy::result_large_err)]

pub use http;

pub mod broadcast;
pub mod config;
pub mod error;
pub mod handshake;
pub mod http_proto;
pub mod membership;
pub mod middleware;
pub mod protocol;
pub mod queue;
pub mod ratelimit;
pub mod registry;
pub mod route;
pub mod server;
pub mod stream;
pub mod util;
pub mod validation;

/// Maximum allowed WebSocket frame payload: the implementation cap from RFC 6455 §5.2.
pub const MAX_ALLOWED_LEN: usize = 16 * 1024 * 1024;
/// Maximum allowed payload on a control frame (RFC 6455 §5.5).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;
/// Maximum number of continuation frames accepted while reassembling a fragmented message.
pub const MAX_CONTINUATION_FRAMES: usize = 1024;

pub use bytes::Bytes;
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use server::Server;