//! The literal RFC 6455 opening-handshake example: the well-known test key
//! `dGhlIHNhbXBsZSBub25jZQ==` must derive the equally well-known accept value.

use sockeon::handshake::{format_accept_response, HandshakeRequest};

const REQUEST: &[u8] = b"GET /chat?t=abc HTTP/1.1\r\n\
Host: x\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
Sec-WebSocket-Version: 13\r\n\r\n";

#[test]
fn well_known_key_derives_the_well_known_accept_value() {
    let (consumed, request) = HandshakeRequest::parse(REQUEST).unwrap().unwrap();
    assert_eq!(consumed, REQUEST.len());

    let key = request.validate(&[]).unwrap();
    assert_eq!(key, "dGhlIHNhbXBsZSBub25jZQ==");

    let response = format_accept_response(key).unwrap();
    let response = String::from_utf8(response).unwrap();

    assert!(response.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
    assert!(response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
}

#[test]
fn query_string_on_the_upgrade_path_does_not_break_parsing() {
    let (_, request) = HandshakeRequest::parse(REQUEST).unwrap().unwrap();
    assert_eq!(request.uri.path(), "/chat");
    assert_eq!(request.uri.query(), Some("t=abc"));
}
