//! Resolving a broadcast target to a set of clients and queuing framed bytes
//! onto their outbound buffers.
//!
//! This module never touches the network directly: the event loop still owns
//! flushing `Connection::outbound`, so a broadcast issued from inside a
//! handler or from the external queue reader behaves identically either way.

mod dispatcher;

pub use dispatcher::{broadcast_event, dispatch_message, Target};
