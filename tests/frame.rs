//! Frame codec round-trip (decode(encode(p, o)) == (fin, opcode, p)) and a
//! masked-ping / unmasked-pong control-frame scenario.

use sockeon::protocol::{
    frame::{
        codec::{Control, Data, OpCode},
        decode, Frame, FrameHeader,
    },
    FrameLimits,
    Message,
};

/// Build the raw wire bytes of a client->server masked frame, the way a
/// conforming client would: header (with mask) via the public formatter,
/// payload XORed with that same mask.
fn masked_client_frame(opcode: OpCode, payload: &[u8]) -> Vec<u8> {
    let mask = [0x12, 0x34, 0x56, 0x78];
    let header = FrameHeader { fin: true, opcode, mask: Some(mask), ..FrameHeader::default() };

    let mut buf = Vec::new();
    header.format(payload.len() as u64, &mut buf).unwrap();
    buf.extend(payload.iter().enumerate().map(|(i, b)| b ^ mask[i % 4]));
    buf
}

#[test]
fn round_trips_a_text_frame_through_decode() {
    let payload = b"hello world";
    let bytes = masked_client_frame(OpCode::Data(Data::Text), payload);

    let decoded = decode(&bytes, &FrameLimits::default(), true).unwrap();
    assert_eq!(decoded.frames.len(), 1);
    assert!(decoded.residual.is_empty());

    let frame = &decoded.frames[0];
    assert!(frame.header().fin);
    assert_eq!(frame.header().opcode, OpCode::Data(Data::Text));
    assert_eq!(frame.payload(), payload);
}

#[test]
fn a_masked_ping_decodes_with_its_payload_unmasked() {
    let bytes = masked_client_frame(OpCode::Control(Control::Ping), b"hello");

    let decoded = decode(&bytes, &FrameLimits::default(), true).unwrap();
    let frame = &decoded.frames[0];
    assert_eq!(frame.header().opcode, OpCode::Control(Control::Ping));
    assert_eq!(frame.payload(), b"hello");
}

#[test]
fn the_servers_pong_reply_is_unmasked_with_the_same_payload() {
    let pong = Message::Pong(b"hello".to_vec()).into_frame();
    assert_eq!(pong.header().opcode, OpCode::Control(Control::Pong));
    assert!(pong.header().mask.is_none(), "server frames are never masked");
    assert_eq!(pong.payload(), b"hello");
}

#[test]
fn an_unmasked_frame_from_a_client_is_rejected() {
    let header = FrameHeader { fin: true, opcode: OpCode::Data(Data::Text), mask: None, ..FrameHeader::default() };
    let mut buf = Vec::new();
    header.format(2, &mut buf).unwrap();
    buf.extend_from_slice(b"hi");

    assert!(decode(&buf, &FrameLimits::default(), true).is_err());
}

#[test]
fn frame_built_directly_from_parts_round_trips_header_and_payload() {
    let header = FrameHeader { fin: true, opcode: OpCode::Data(Data::Binary), mask: None, ..FrameHeader::default() };
    let frame = Frame::new(header, bytes::Bytes::from_static(b"abc"));
    assert_eq!(frame.payload(), b"abc");
}
