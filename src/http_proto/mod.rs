//! Plain HTTP/1.1 request parsing and response building.
//!
//! Named `http_proto` rather than `http` because [`crate`] re-exports the
//! `http` crate itself at its root for its shared `Method`/`StatusCode`/
//! `HeaderMap` types.

pub mod query;
pub mod request;
pub mod response;

pub use request::Request;
pub use response::Response;
