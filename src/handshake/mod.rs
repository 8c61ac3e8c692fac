//! RFC 6455 handshake: one-shot request parsing, validation and accept-key derivation.

pub mod accept;
mod headers;
pub mod request;

pub use accept::{derive_accept_key, format_accept_response};
pub use request::HandshakeRequest;
