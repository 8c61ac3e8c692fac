//! One-shot handshake request parsing.
//!
//! This is a pure function over an already-accumulated buffer: the event
//! loop keeps reading into a per-client `Vec<u8>` until `parse` returns a
//! complete request (or a protocol error), exactly the same shape as
//! [`frame::decode`](crate::protocol::frame::decode).

use http::{HeaderMap, Method, Uri, Version};
use httparse::{Status, EMPTY_HEADER};

use super::headers::{FromHttparse, MAX_HEADERS};
use crate::error::{Error, ProtocolError, Result};

/// A parsed (but not yet validated) WebSocket upgrade request.
#[derive(Debug, Clone)]
pub struct HandshakeRequest {
    /// Request method, expected to be `GET`.
    pub method: Method,
    /// Request target.
    pub uri: Uri,
    /// HTTP version, expected to be at least 1.1.
    pub version: Version,
    /// All request headers.
    pub headers: HeaderMap,
}

impl HandshakeRequest {
    /// Parse a request out of `buf`. Returns `None` if `buf` doesn't yet
    /// contain a complete request line + headers.
    pub fn parse(buf: &[u8]) -> Result<Option<(usize, Self)>> {
        let mut header_buf = [EMPTY_HEADER; MAX_HEADERS];
        let mut raw = httparse::Request::new(&mut header_buf);

        let consumed = match raw.parse(buf) {
            Ok(Status::Complete(n)) => n,
            Ok(Status::Partial) => return Ok(None),
            Err(e) => return Err(Error::from(e)),
        };

        if raw.method != Some("GET") {
            return Err(Error::Protocol(ProtocolError::InvalidHttpMethod));
        }

        let version = match raw.version {
            Some(1) => Version::HTTP_11,
            _ => return Err(Error::Protocol(ProtocolError::InvalidHttpVersion)),
        };

        let uri: Uri = raw.path.ok_or(Error::Protocol(ProtocolError::MalformedRequest))?.parse()?;
        let headers = HeaderMap::from_httparse(raw.headers)?;

        Ok(Some((consumed, HandshakeRequest { method: Method::GET, uri, version, headers })))
    }

    /// Validate the upgrade-specific headers per RFC 6455 §4.2.1, and return
    /// the `Sec-WebSocket-Key` value needed to derive the accept key.
    ///
    /// `allowed_origins` is empty to mean "no restriction"; otherwise the
    /// `Origin` header (if present) must match one of the given values.
    pub fn validate(&self, allowed_origins: &[String]) -> Result<&str> {
        if self.version < Version::HTTP_11 {
            return Err(Error::Protocol(ProtocolError::InvalidHttpVersion));
        }

        let has_upgrade_token = |name: &str, token: &str| {
            self.headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(|v| v.split(|c| c == ',' || c == ' ').any(|s| s.eq_ignore_ascii_case(token)))
                .unwrap_or(false)
        };

        if !has_upgrade_token("Connection", "Upgrade") {
            return Err(Error::Protocol(ProtocolError::MissingConnectionUpgradeHeader));
        }

        if !self
            .headers
            .get("Upgrade")
            .and_then(|h| h.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("websocket"))
            .unwrap_or(false)
        {
            return Err(Error::Protocol(ProtocolError::MissingUpgradeHeader));
        }

        if self.headers.get("Sec-WebSocket-Version").and_then(|h| h.to_str().ok()) != Some("13") {
            return Err(Error::Protocol(ProtocolError::UnsupportedVersion));
        }

        let wildcard = allowed_origins.len() == 1 && allowed_origins[0] == "*";

        if !allowed_origins.is_empty() && !wildcard {
            if let Some(origin) = self.headers.get("Origin").and_then(|h| h.to_str().ok()) {
                if !allowed_origins.iter().any(|allowed| allowed == origin) {
                    return Err(Error::Protocol(ProtocolError::OriginNotAllowed));
                }
            }
        }

        self.headers
            .get("Sec-WebSocket-Key")
            .and_then(|h| h.to_str().ok())
            .ok_or(Error::Protocol(ProtocolError::MissingKeyHeader))
    }
}
