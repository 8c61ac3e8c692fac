//! WebSocket wire protocol: frame codec, message assembly and per-connection limits.

pub mod config;
pub mod frame;
pub mod message;

pub use config::FrameLimits;
pub use message::Message;
