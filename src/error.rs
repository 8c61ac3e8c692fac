//! Error handling.
//!
//! Mirrors the error taxonomy from the design: `ProtocolError` for malformed
//! wire data (closes the offending connection only), `HandlerError` for
//! exceptions raised by user code, `ValidationError` for the (external)
//! validation collaborator, `RateLimitError`, and `ResourceError` for
//! buffer/accept failures. `Error` is the top-level enum everything else
//! converts into.

use std::{fmt, io, str::Utf8Error, string::FromUtf8Error};

use http::HeaderName;
use thiserror::Error;

/// Generic result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Context attached to every error reported through the error boundary (§7):
/// which client it happened to and which phase of the pipeline it happened in.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// The client the error occurred on, if any (listener-level errors have none).
    pub client_id: Option<u64>,
    /// Which phase of the pipeline raised the error.
    pub phase: Phase,
}

impl ErrorContext {
    /// Build a new error context.
    pub fn new(client_id: Option<u64>, phase: Phase) -> Self {
        Self { client_id, phase }
    }
}

/// Pipeline phase, used for error-boundary logging context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepting a new TCP connection.
    Accept,
    /// Performing (or attempting) the WebSocket handshake.
    Handshake,
    /// Decoding bytes into frames or an HTTP request.
    Decode,
    /// Running middleware + handler dispatch.
    Dispatch,
    /// Emitting a broadcast to one or more clients.
    Broadcast,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Accept => "accept",
            Phase::Handshake => "handshake",
            Phase::Decode => "decode",
            Phase::Dispatch => "dispatch",
            Phase::Broadcast => "broadcast",
        };
        f.write_str(s)
    }
}

/// Top level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// WebSocket connection closed normally. Not an error as such.
    #[error("connection closed")]
    ConnectionClosed,

    /// Input-output error. Apart from `WouldBlock`, these are generally fatal
    /// for the connection they occurred on.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Protocol violation in a frame or HTTP request.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8(String),

    /// Outgoing buffer is full (back-pressure high-water mark exceeded).
    #[error("write buffer is full")]
    WriteBufferFull,

    /// Capacity exceeded, either reading (buffer exhausted) or writing
    /// (message bigger than the configured maximum).
    #[error("capacity error: {0}")]
    Capacity(#[from] CapacityError),

    /// HTTP message framing error.
    #[error("HTTP format error: {0}")]
    HttpFormat(#[from] http::Error),

    /// An exception raised by user handler/middleware code.
    #[error("handler error: {0}")]
    Handler(#[from] HandlerError),

    /// A validation failure produced by the (external) validation collaborator.
    #[error("validation error")]
    Validation(#[from] crate::validation::ValidationError),

    /// A rate-limit rejection.
    #[error("rate limit exceeded")]
    RateLimit(#[from] crate::ratelimit::RateLimitError),

    /// Resource exhaustion: write buffer overflow or accept failure.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Bind failure or other unrecoverable loop condition.
    #[error("fatal error: {0}")]
    Fatal(String),
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Error::Utf8(value.to_string())
    }
}

impl From<FromUtf8Error> for Error {
    fn from(value: FromUtf8Error) -> Self {
        Error::Utf8(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Fatal(format!("JSON error: {value}"))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(value: http::header::InvalidHeaderName) -> Self {
        Error::HttpFormat(value.into())
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(value: http::header::InvalidHeaderValue) -> Self {
        Error::HttpFormat(value.into())
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(value: http::header::ToStrError) -> Self {
        Error::Utf8(value.to_string())
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(value: http::uri::InvalidUri) -> Self {
        Error::HttpFormat(value.into())
    }
}

impl From<http::status::InvalidStatusCode> for Error {
    fn from(value: http::status::InvalidStatusCode) -> Self {
        Error::HttpFormat(value.into())
    }
}

impl From<httparse::Error> for Error {
    fn from(value: httparse::Error) -> Self {
        match value {
            httparse::Error::TooManyHeaders => Error::Capacity(CapacityError::TooManyHeaders),
            e => Error::Protocol(ProtocolError::HttparseError(e)),
        }
    }
}

/// Indicates the specific type/cause of a protocol error. Closes the
/// offending connection only; never cascades to other clients.
#[derive(Debug, Error, Clone)]
pub enum ProtocolError {
    /// Use of the wrong HTTP method on a handshake request (must be GET).
    #[error("invalid HTTP method (must be GET)")]
    InvalidHttpMethod,

    /// Wrong HTTP version used (the WebSocket protocol requires 1.1+).
    #[error("unsupported HTTP version (must be at least HTTP/1.1)")]
    InvalidHttpVersion,

    /// Missing, duplicated or incorrect header.
    #[error("missing, duplicated or incorrect header {0}")]
    InvalidHeader(HeaderName),

    /// Missing `Connection: upgrade` HTTP header.
    #[error("missing 'Connection: upgrade' header")]
    MissingConnectionUpgradeHeader,

    /// Missing `Upgrade: websocket` HTTP header.
    #[error("missing 'Upgrade: websocket' header")]
    MissingUpgradeHeader,

    /// `Sec-WebSocket-Version` missing or not `13`.
    #[error("missing or unsupported 'Sec-WebSocket-Version' header")]
    UnsupportedVersion,

    /// Missing `Sec-WebSocket-Key` HTTP header.
    #[error("missing 'Sec-WebSocket-Key' header")]
    MissingKeyHeader,

    /// `Origin` header present but not in the configured allow-list.
    #[error("origin not allowed")]
    OriginNotAllowed,

    /// No more data while still performing the handshake.
    #[error("handshake incomplete")]
    IncompleteHandshake,

    /// Wrapper around an [`httparse::Error`].
    #[error("httparse error: {0}")]
    HttparseError(#[from] httparse::Error),

    /// Reserved bits in frame header are non-zero.
    #[error("frame with non-zero reserved bits")]
    NonZeroReservedBits,

    /// Control frames must not be fragmented.
    #[error("control frame must not be fragmented")]
    FragmentedControlFrame,

    /// Control frames must have a payload of 125 bytes or less.
    #[error("control frame payload too large")]
    ControlFrameTooBig,

    /// The server must close the connection when an unmasked frame is received.
    #[error("received unmasked frame from client")]
    UnmaskedFrameFromClient,

    /// Encountered an invalid control opcode.
    #[error("received unknown control opcode: {0}")]
    UnknownControlOpCode(u8),

    /// Encountered an invalid data opcode.
    #[error("received unknown data opcode: {0}")]
    UnknownDataOpCode(u8),

    /// Received a continuation frame despite there being nothing to continue.
    #[error("received continuation frame without an open fragmentation context")]
    UnexpectedContinuation,

    /// Too many continuation frames while reassembling a fragmented message.
    #[error("too many continuation frames")]
    TooManyContinuations,

    /// The payload for the closing frame is invalid.
    #[error("invalid close frame payload")]
    InvalidCloseFrame,

    /// Garbage data encountered after a client request.
    #[error("junk after client request")]
    JunkAfterRequest,

    /// Malformed HTTP request line or headers.
    #[error("malformed HTTP request")]
    MalformedRequest,
}

/// Indicates the specific type/cause of a capacity error.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum CapacityError {
    /// Too many headers provided (see [`httparse::Error::TooManyHeaders`]).
    #[error("too many headers received")]
    TooManyHeaders,

    /// Message is bigger than the configured maximum allowed size.
    #[error("payload too large: {size} > {max}")]
    MessageTooLarge {
        /// The size of the message that was rejected.
        size: usize,
        /// The maximum allowed message size.
        max: usize,
    },
}

/// An exception raised from user handler or middleware code.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    /// Human readable description of the failure.
    pub message: String,
    /// The underlying cause, if the handler produced one.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    /// Construct a handler error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self { message: message.into(), source: None }
    }

    /// Construct a handler error wrapping an underlying cause.
    pub fn from_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self { message: message.into(), source: Some(Box::new(source)) }
    }
}

/// Resource exhaustion: write buffer overflow, accept failure.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The per-client outbound buffer exceeded the configured high-water mark.
    #[error("outbound buffer exceeded high-water mark ({size} > {limit} bytes)")]
    BackpressureExceeded {
        /// Size the outbound buffer had reached.
        size: usize,
        /// The configured high-water mark.
        limit: usize,
    },

    /// `accept()` on the listening socket failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] io::Error),
}
