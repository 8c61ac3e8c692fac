//! WebSocket opcodes and close codes (RFC 6455 §5.2, §7.4).

use std::fmt::Display;

/// A WebSocket frame opcode: either data or control.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum OpCode {
    /// Data (text or binary, or a continuation of one).
    Data(Data),
    /// Control (close, ping, pong).
    Control(Control),
}

/// Data opcodes, RFC 6455 §5.2.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Data {
    /// Continuation of a fragmented message.
    Continuation,
    /// A complete (or first-fragment) text message.
    Text,
    /// A complete (or first-fragment) binary message.
    Binary,
    /// Reserved for future non-control opcodes (0x3-0x7).
    Reserved(u8),
}

/// Control opcodes, RFC 6455 §5.5.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Control {
    /// Connection close.
    Close,
    /// Heartbeat request.
    Ping,
    /// Heartbeat reply.
    Pong,
    /// Reserved for future control opcodes (0xb-0xf).
    Reserved(u8),
}

impl Display for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Continuation => write!(f, "continuation"),
            Self::Text => write!(f, "text"),
            Self::Binary => write!(f, "binary"),
            Self::Reserved(code) => write!(f, "reserved-data({code:#x})"),
        }
    }
}

impl Display for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Close => write!(f, "close"),
            Self::Ping => write!(f, "ping"),
            Self::Pong => write!(f, "pong"),
            Self::Reserved(code) => write!(f, "reserved-control({code:#x})"),
        }
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data(data) => data.fmt(f),
            Self::Control(control) => control.fmt(f),
        }
    }
}

impl From<u8> for OpCode {
    fn from(byte: u8) -> Self {
        match byte {
            0x0 => Self::Data(Data::Continuation),
            0x1 => Self::Data(Data::Text),
            0x2 => Self::Data(Data::Binary),
            0x3..=0x7 => Self::Data(Data::Reserved(byte)),
            0x8 => Self::Control(Control::Close),
            0x9 => Self::Control(Control::Ping),
            0xA => Self::Control(Control::Pong),
            0xB..=0xF => Self::Control(Control::Reserved(byte)),
            _ => unreachable!("opcode is read from a 4-bit field, always in 0x0..=0xF"),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(opcode: OpCode) -> Self {
        match opcode {
            OpCode::Data(Data::Continuation) => 0x0,
            OpCode::Data(Data::Text) => 0x1,
            OpCode::Data(Data::Binary) => 0x2,
            OpCode::Data(Data::Reserved(byte)) => byte,
            OpCode::Control(Control::Close) => 0x8,
            OpCode::Control(Control::Ping) => 0x9,
            OpCode::Control(Control::Pong) => 0xA,
            OpCode::Control(Control::Reserved(byte)) => byte,
        }
    }
}

/// Why a WebSocket connection is closing, carried in a close frame's payload.
///
/// Decoding a wire close code is total: any `u16` a peer sends, even one
/// outside every registered range, lands in one of the catch-all variants
/// below rather than failing to parse.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CloseCode {
    /// Normal closure; the purpose of the connection has been fulfilled.
    Normal,
    /// An endpoint is going away (server shutdown, page navigation).
    Away,
    /// The peer is terminating the connection due to a protocol error.
    Protocol,
    /// The peer received a frame of a data type it cannot accept.
    Unsupported,
    /// Reserved: MUST NOT be sent over the wire, only used locally to mean
    /// "no status code was present in the close frame."
    NoStatus,
    /// Reserved: MUST NOT be sent over the wire, only used locally to mean
    /// "the connection dropped without a close frame at all."
    Abnormal,
    /// The peer received data inconsistent with the message type (e.g.
    /// non-UTF-8 payload in a text message).
    InvalidPayload,
    /// Generic policy violation, when no more specific code applies.
    PolicyViolation,
    /// The received message is too big to process.
    MessageTooBig,
    /// The client expected the server to negotiate an extension it didn't.
    ExtensionRequired,
    /// The peer hit an unexpected condition while fulfilling the request.
    InternalError,
    /// The server is restarting; the client may reconnect with backoff.
    ServiceRestart,
    /// The server is overloaded; try again later or against a different host.
    TryAgainLater,
    /// Reserved: MUST NOT be sent over the wire (TLS handshake failure, local use only).
    TlsHandshakeFailed,
    /// In the range reserved by the RFC for future protocol-defined codes.
    ProtocolReserved(u16),
    /// In IANA's registered range for application-defined codes.
    Iana(u16),
    /// In the range reserved for WebSocket library/framework private use.
    PrivateUse(u16),
    /// Outside every defined or reserved range.
    Unrecognized(u16),
}

impl CloseCode {
    /// Whether this code is one a peer may legally send on the wire.
    /// `NoStatus`, `Abnormal`, `TlsHandshakeFailed` and `ProtocolReserved`
    /// exist only to describe local conditions or protocol-reserved gaps.
    pub fn allowed(self) -> bool {
        !matches!(self, Self::NoStatus | Self::Abnormal | Self::TlsHandshakeFailed | Self::ProtocolReserved(_))
    }
}

impl Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u16::from(*self))
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::Away,
            1002 => Self::Protocol,
            1003 => Self::Unsupported,
            1005 => Self::NoStatus,
            1006 => Self::Abnormal,
            1007 => Self::InvalidPayload,
            1008 => Self::PolicyViolation,
            1009 => Self::MessageTooBig,
            1010 => Self::ExtensionRequired,
            1011 => Self::InternalError,
            1012 => Self::ServiceRestart,
            1013 => Self::TryAgainLater,
            1015 => Self::TlsHandshakeFailed,
            1..=999 => Self::Unrecognized(code),
            1004 | 1014 | 1016..=2999 => Self::ProtocolReserved(code),
            3000..=3999 => Self::Iana(code),
            4000..=4999 => Self::PrivateUse(code),
            _ => Self::Unrecognized(code),
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        match code {
            CloseCode::Normal => 1000,
            CloseCode::Away => 1001,
            CloseCode::Protocol => 1002,
            CloseCode::Unsupported => 1003,
            CloseCode::NoStatus => 1005,
            CloseCode::Abnormal => 1006,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::ExtensionRequired => 1010,
            CloseCode::InternalError => 1011,
            CloseCode::ServiceRestart => 1012,
            CloseCode::TryAgainLater => 1013,
            CloseCode::TlsHandshakeFailed => 1015,
            CloseCode::ProtocolReserved(code)
            | CloseCode::Iana(code)
            | CloseCode::PrivateUse(code)
            | CloseCode::Unrecognized(code) => code,
        }
    }
}
