//! Declarative HTTP route and WebSocket event registration.
//!
//! Registration is explicit and typed rather than reflection-based: there is
//! no idiomatic Rust equivalent of scanning attributes on controller methods,
//! so applications call [`builder::Router::route`]/[`builder::Router::on_event`]
//! (or group them with a [`builder::Controller`]) once at startup, and the
//! resulting tables are matched on every request/message after that.

pub mod builder;
mod events;
mod pattern;
mod table;

pub use builder::{Controller, EventHandle, Router, RouteHandle};
pub use events::{EventEntry, EventHandler, EventTable};
pub use pattern::Pattern;
pub use table::{HttpHandler, RouteEntry, RouteTable};
