//! Frame module: RFC 6455 frame header parsing/formatting, masking and decoding.

pub mod assembler;
pub mod codec;
pub mod decode;

#[allow(clippy::module_inception)]
mod frame;
mod mask;
mod utf;

pub use self::{
    assembler::Assembler,
    decode::{decode, Decoded},
    frame::{CloseFrame, Frame, FrameHeader},
    utf::Utf8Bytes,
};
