//! Sliding-window rate limiting, scoped per `(scope, ip)` pair.

mod limiter;

pub use limiter::{RateLimitRule, RateLimiter};

use std::time::Duration;
use thiserror::Error;

/// A rate-limit rejection.
#[derive(Debug, Error, Clone)]
#[error("rate limit exceeded for '{scope}'; retry after {retry_after:?}")]
pub struct RateLimitError {
    /// The scope that was exceeded, e.g. `"global-ws"` or `"event:chat:message"`.
    pub scope: String,
    /// How long the caller should wait before the window frees up again.
    pub retry_after: Duration,
}

/// The fixed scope names used for the two global buckets.
pub mod scope {
    /// Scope for any HTTP request not covered by a more specific route scope.
    pub const GLOBAL_HTTP: &str = "global-http";
    /// Scope for any WebSocket message not covered by a more specific event scope.
    pub const GLOBAL_WS: &str = "global-ws";

    /// Build the scope name for a specific HTTP route.
    pub fn route(method: &http::Method, path: &str) -> String {
        format!("route:{method} {path}")
    }

    /// Build the scope name for a specific WebSocket event.
    pub fn event(name: &str) -> String {
        format!("event:{name}")
    }
}
