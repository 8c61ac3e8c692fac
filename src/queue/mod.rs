//! External broadcast queue: a newline-delimited JSON file that other
//! processes append to, so a CLI script or a separate worker can push
//! messages into the running server without an extra network hop.

mod reader;

pub use reader::{QueueEntry, QueueReader};
