//! Protocol detection on the first bytes of a connection.
//!
//! Rather than the literal method-token-plus-header-substring scan, this
//! reuses the handshake parser itself as the sniff: a [`HandshakeRequest`]
//! requires `GET` and a well-formed request line, so any buffer that fails
//! to parse as one, or parses but lacks upgrade intent, is plain HTTP.

use crate::{
    error::{Error, ProtocolError},
    handshake::HandshakeRequest,
};

/// Outcome of sniffing a connection's buffered bytes.
pub enum Sniff {
    /// Not enough bytes yet to decide either way.
    Incomplete,
    /// Doesn't look like (or isn't trying to be) a WebSocket upgrade; hand
    /// the buffer to the HTTP parser instead.
    Http,
    /// A validated upgrade request, ready for handshake middleware and then
    /// the `101` response. `consumed` is the number of bytes the request
    /// occupied, already excluding any pipelined bytes that follow it.
    Upgrade { consumed: usize, request: HandshakeRequest, key: String },
    /// Looked like an upgrade attempt but failed RFC 6455 validation; the
    /// connection should be answered with an error status and closed.
    Reject(Error),
}

/// Sniff `buf` for an upgrade attempt against `allowed_origins`.
pub fn sniff(buf: &[u8], allowed_origins: &[String]) -> Sniff {
    match HandshakeRequest::parse(buf) {
        Ok(None) => Sniff::Incomplete,
        Ok(Some((consumed, request))) => match request.validate(allowed_origins) {
            Ok(key) => {
                let key = key.to_string();
                Sniff::Upgrade { consumed, request, key }
            }
            Err(Error::Protocol(
                ProtocolError::MissingConnectionUpgradeHeader | ProtocolError::MissingUpgradeHeader,
            )) => Sniff::Http,
            Err(other) => Sniff::Reject(other),
        },
        // Not a GET, not HTTP/1.1+, or otherwise not even request-line-shaped:
        // none of that rules out plain HTTP, so let that parser have it.
        Err(_) => Sniff::Http,
    }
}

/// Map a rejected handshake to the HTTP status code it should be answered with.
pub fn reject_status(error: &Error) -> http::StatusCode {
    match error {
        Error::Protocol(ProtocolError::UnsupportedVersion) => http::StatusCode::UPGRADE_REQUIRED,
        Error::Protocol(ProtocolError::OriginNotAllowed) => http::StatusCode::FORBIDDEN,
        _ => http::StatusCode::BAD_REQUEST,
    }
}
