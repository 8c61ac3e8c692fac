//! Pure buffer-to-frames decoding.
//!
//! Unlike a stream-driving codec, [`decode`] never touches I/O: the event loop
//! owns a per-client `Vec<u8>` of whatever has been read off the socket so far,
//! and calls this function to pull as many complete frames out of it as
//! possible. Bytes that don't yet form a complete frame are returned as
//! `residual` and left for the next read to extend.

use std::io::Cursor;

use bytes::Buf;

use super::{
    frame::{Frame, FrameHeader},
    mask::apply_mask,
};
use crate::{
    error::{CapacityError, Error, ProtocolError, Result},
    protocol::config::FrameLimits,
};

/// Result of a single [`decode`] call.
#[derive(Debug)]
pub struct Decoded {
    /// Frames fully read out of the buffer, in arrival order.
    pub frames: Vec<Frame>,
    /// Bytes left over that didn't form a complete frame yet.
    pub residual: Vec<u8>,
}

/// Decode as many complete frames as `buf` contains.
///
/// `require_mask` should be `true` for bytes arriving from a client (server
/// role) and `false` for bytes a client would read from a server; `sockeon`
/// only ever decodes the former, but the flag is kept explicit rather than
/// hard-coded so the function documents the RFC 6455 §5.1 masking rule it
/// enforces.
pub fn decode(buf: &[u8], limits: &FrameLimits, require_mask: bool) -> Result<Decoded> {
    let mut cursor = Cursor::new(buf);
    let mut frames = Vec::new();

    loop {
        let start = cursor.position();

        let Some((header, len)) = FrameHeader::parse(&mut cursor)? else {
            cursor.set_position(start);
            break;
        };

        let len = len as usize;
        if len > limits.max_frame_size {
            return Err(Error::Capacity(CapacityError::MessageTooLarge { size: len, max: limits.max_frame_size }));
        }

        if cursor.remaining() < len {
            cursor.set_position(start);
            break;
        }

        let mut payload = vec![0u8; len];
        cursor.copy_to_slice(&mut payload);

        let mut header = header;
        if let Some(mask) = header.mask.take() {
            apply_mask(&mut payload, mask);
        } else if require_mask && !limits.accept_unmasked_frames {
            return Err(Error::Protocol(ProtocolError::UnmaskedFrameFromClient));
        }

        frames.push(Frame::new(header, payload.into()));
    }

    let pos = cursor.position() as usize;
    let residual = buf[pos..].to_vec();

    Ok(Decoded { frames, residual })
}
