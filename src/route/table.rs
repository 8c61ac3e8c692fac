//! The HTTP route table: registered once, matched on every request.

use std::{collections::HashMap, sync::Arc};

use http::Method;

use super::pattern::Pattern;
use crate::{
    error::Result,
    http_proto::{Request, Response},
    middleware::HttpMiddleware,
    ratelimit::RateLimitRule,
};

/// An HTTP route handler.
pub type HttpHandler = Arc<dyn Fn(&Request) -> Result<Response> + Send + Sync>;

/// One registered route.
pub struct RouteEntry {
    pub(crate) method: Method,
    pub(crate) pattern: Pattern,
    pub(crate) handler: HttpHandler,
    pub(crate) middlewares: Vec<Arc<dyn HttpMiddleware>>,
    pub(crate) excluded_global: Vec<String>,
    pub(crate) rate_limit: Option<RateLimitRule>,
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry").field("method", &self.method).finish_non_exhaustive()
    }
}

/// The full set of registered HTTP routes, scanned once at construction.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<RouteEntry>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route, returning its index for further configuration
    /// (middleware, exclusions, rate limits) via the caller's builder.
    pub fn register(&mut self, method: Method, path: &str, handler: HttpHandler) -> usize {
        self.routes.push(RouteEntry {
            method,
            pattern: Pattern::compile(path),
            handler,
            middlewares: Vec::new(),
            excluded_global: Vec::new(),
            rate_limit: None,
        });
        self.routes.len() - 1
    }

    /// Mutably access a previously registered route by index.
    pub fn entry_mut(&mut self, index: usize) -> &mut RouteEntry {
        &mut self.routes[index]
    }

    /// Find the best match for `method`/`path`: among routes whose method and
    /// pattern both match, prefer the most specific pattern (more literal
    /// segments), breaking ties in favor of the earliest registered.
    ///
    /// `Iterator::max_by_key` keeps the *last* element on a tie, which would
    /// favor the most-recently-registered route; this keeps the first.
    pub fn matches(&self, method: &Method, path: &str) -> Option<(&RouteEntry, HashMap<String, String>)> {
        let mut best: Option<(&RouteEntry, HashMap<String, String>)> = None;

        for route in self.routes.iter().filter(|r| &r.method == method) {
            let Some(params) = route.pattern.matches(path) else { continue };

            let better = match &best {
                Some((current, _)) => route.pattern.specificity() > current.pattern.specificity(),
                None => true,
            };

            if better {
                best = Some((route, params));
            }
        }

        best
    }
}
