//! A decoded WebSocket message: the result of frame assembly, or the unit the
//! broadcast dispatcher hands to the frame encoder on the way back out.

use bytes::Bytes;

use super::frame::{
    codec::{Data, OpCode},
    CloseFrame, Frame,
};

/// A complete WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A text message.
    Text(String),
    /// A binary message.
    Binary(Vec<u8>),
    /// A ping control frame.
    Ping(Vec<u8>),
    /// A pong control frame.
    Pong(Vec<u8>),
    /// A close control frame, with an optional `(code, reason)`.
    Close(Option<(u16, String)>),
}

impl Message {
    /// Whether this is a control message (ping/pong/close).
    pub fn is_control(&self) -> bool {
        matches!(self, Message::Ping(_) | Message::Pong(_) | Message::Close(_))
    }

    /// Consume the message into its raw payload bytes.
    pub fn into_data(self) -> Vec<u8> {
        match self {
            Self::Text(s) => s.into_bytes(),
            Self::Binary(b) => b,
            Self::Ping(b) => b,
            Self::Pong(b) => b,
            Self::Close(Some((code, reason))) => {
                let mut buf = Vec::with_capacity(2 + reason.len());
                buf.extend_from_slice(&code.to_be_bytes());
                buf.extend_from_slice(reason.as_bytes());
                buf
            }
            Self::Close(None) => vec![],
        }
    }

    /// Encode this message as a server-to-client frame. Server frames are
    /// never masked (RFC 6455 §5.1).
    pub fn into_frame(self) -> Frame {
        match self {
            Self::Text(s) => Frame::new_data(Bytes::from(s.into_bytes()), OpCode::Data(Data::Text), true),
            Self::Binary(b) => Frame::new_data(Bytes::from(b), OpCode::Data(Data::Binary), true),
            Self::Ping(b) => Frame::new_ping(Bytes::from(b)),
            Self::Pong(b) => Frame::new_pong(Bytes::from(b)),
            Self::Close(payload) => Frame::new_close(payload.map(|(code, reason)| CloseFrame {
                code: code.into(),
                reason: reason.into(),
            })),
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Text(s) => write!(f, "Text({s})"),
            Message::Binary(b) => write!(f, "Binary({} bytes)", b.len()),
            Message::Ping(_) => write!(f, "Ping"),
            Message::Pong(_) => write!(f, "Pong"),
            Message::Close(Some((code, reason))) => write!(f, "Close({code}, {reason})"),
            Message::Close(None) => write!(f, "Close"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_message_encodes_to_a_fin_text_frame() {
        let frame = Message::Text("hi".into()).into_frame();
        assert!(frame.header().fin);
        assert_eq!(frame.payload(), b"hi");
    }

    #[test]
    fn close_message_round_trips_code_and_reason() {
        let frame = Message::Close(Some((1000, "bye".into()))).into_frame();
        assert_eq!(frame.payload()[..2], 1000u16.to_be_bytes());
        assert_eq!(&frame.payload()[2..], b"bye");
    }
}
