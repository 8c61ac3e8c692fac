//! Fragmented message reassembly.
//!
//! A single WebSocket message may be split across an initial data frame and
//! zero or more continuation frames. `Assembler` tracks that in-progress
//! reassembly for one connection and turns finished frames into
//! [`Message`](crate::protocol::Message) values; control frames are never
//! fragmented and pass straight through.

use bytes::BytesMut;

use crate::{
    error::{Error, ProtocolError, Result},
    protocol::{
        frame::{
            codec::{Control, Data, OpCode},
            Frame,
        },
        message::Message,
    },
};

#[derive(Debug)]
struct InProgress {
    opcode: Data,
    buf: BytesMut,
    continuations: usize,
}

/// Per-connection fragmentation state.
#[derive(Debug, Default)]
pub struct Assembler {
    in_progress: Option<InProgress>,
    max_continuation_frames: usize,
    max_message_size: usize,
}

impl Assembler {
    /// Create a new assembler bound to the given limits.
    pub fn new(max_continuation_frames: usize, max_message_size: usize) -> Self {
        Self { in_progress: None, max_continuation_frames, max_message_size }
    }

    /// Feed one frame, returning a completed message if this frame finished one.
    pub fn push(&mut self, frame: Frame) -> Result<Option<Message>> {
        let header = frame.header().clone();

        match header.opcode {
            OpCode::Control(Control::Close) => {
                let close = frame.into_close()?;
                Ok(Some(Message::Close(close.map(|c| (c.code.into(), c.reason.to_string())))))
            }
            OpCode::Control(Control::Ping) => Ok(Some(Message::Ping(frame.into_payload().to_vec()))),
            OpCode::Control(Control::Pong) => Ok(Some(Message::Pong(frame.into_payload().to_vec()))),
            OpCode::Control(Control::Reserved(op)) => Err(Error::Protocol(ProtocolError::UnknownControlOpCode(op))),

            OpCode::Data(Data::Continuation) => self.push_continuation(frame, header.fin),

            OpCode::Data(opcode @ (Data::Text | Data::Binary)) => {
                if self.in_progress.is_some() {
                    return Err(Error::Protocol(ProtocolError::UnexpectedContinuation));
                }

                if header.fin {
                    return Ok(Some(Self::finish(opcode, frame.into_payload().to_vec())?));
                }

                let mut buf = BytesMut::new();
                buf.extend_from_slice(frame.payload());
                self.in_progress = Some(InProgress { opcode, buf, continuations: 0 });
                Ok(None)
            }

            OpCode::Data(Data::Reserved(op)) => Err(Error::Protocol(ProtocolError::UnknownDataOpCode(op))),
        }
    }

    fn push_continuation(&mut self, frame: Frame, fin: bool) -> Result<Option<Message>> {
        let state = self.in_progress.as_mut().ok_or(Error::Protocol(ProtocolError::UnexpectedContinuation))?;

        state.continuations += 1;
        if state.continuations > self.max_continuation_frames {
            return Err(Error::Protocol(ProtocolError::TooManyContinuations));
        }

        state.buf.extend_from_slice(frame.payload());
        if state.buf.len() > self.max_message_size {
            return Err(Error::Capacity(crate::error::CapacityError::MessageTooLarge {
                size: state.buf.len(),
                max: self.max_message_size,
            }));
        }

        if !fin {
            return Ok(None);
        }

        let InProgress { opcode, buf, .. } = self.in_progress.take().expect("checked above");
        Self::finish(opcode, buf.to_vec()).map(Some)
    }

    fn finish(opcode: Data, payload: Vec<u8>) -> Result<Message> {
        match opcode {
            Data::Text => Ok(Message::Text(String::from_utf8(payload)?)),
            Data::Binary => Ok(Message::Binary(payload)),
            Data::Continuation | Data::Reserved(_) => unreachable!("finish only called for Text/Binary"),
        }
    }
}
