//! `Sec-WebSocket-Accept` derivation and 101 response formatting (RFC 6455 §1.3, §4.2.2).

use base64::Engine;
use sha1::{Digest, Sha1};

use crate::error::Result;

const WS_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Derive the `Sec-WebSocket-Accept` header value from a `Sec-WebSocket-Key` value.
pub fn derive_accept_key(req_key: &[u8]) -> String {
    let mut hasher = Sha1::default();
    Digest::update(&mut hasher, req_key);
    Digest::update(&mut hasher, WS_GUID);

    base64::engine::general_purpose::STANDARD.encode(Digest::finalize(hasher))
}

/// Format the raw bytes of a successful `101 Switching Protocols` response.
pub fn format_accept_response(key: &str) -> Result<Vec<u8>> {
    let accept = derive_accept_key(key.as_bytes());

    let mut out = Vec::new();
    use std::io::Write;
    write!(
        out,
        "HTTP/1.1 101 Switching Protocols\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\r\n"
    )?;

    Ok(out)
}
