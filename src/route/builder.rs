//! Builder handles returned from registration, for chaining
//! `.middleware(...)`, `.exclude_global(...)` and `.rate_limit(...)` onto a
//! just-registered route or event.

use std::sync::Arc;

use http::Method;

use super::{events::EventTable, table::RouteTable};
use crate::{
    http_proto::{Request, Response},
    middleware::{HttpMiddleware, WsMessageMiddleware},
    ratelimit::RateLimitRule,
};

/// Handle returned by [`RouteBuilder::route`], for configuring a just-registered HTTP route.
#[derive(Debug)]
pub struct RouteHandle<'a> {
    table: &'a mut RouteTable,
    index: usize,
}

impl<'a> RouteHandle<'a> {
    pub(crate) fn new(table: &'a mut RouteTable, index: usize) -> Self {
        Self { table, index }
    }

    /// Append a middleware to this route's local chain.
    pub fn middleware(self, middleware: impl HttpMiddleware + 'static) -> Self {
        self.table.entry_mut(self.index).middlewares.push(Arc::new(middleware));
        self
    }

    /// Exclude named global middlewares from running for this route.
    pub fn exclude_global<I: IntoIterator<Item = S>, S: Into<String>>(self, names: I) -> Self {
        self.table.entry_mut(self.index).excluded_global.extend(names.into_iter().map(Into::into));
        self
    }

    /// Apply a dedicated rate-limit rule to this route.
    pub fn rate_limit(self, rule: RateLimitRule) -> Self {
        self.table.entry_mut(self.index).rate_limit = Some(rule);
        self
    }
}

/// Handle returned when registering a WebSocket event, for the same chaining as [`RouteHandle`].
#[derive(Debug)]
pub struct EventHandle<'a> {
    table: &'a mut EventTable,
    name: String,
}

impl<'a> EventHandle<'a> {
    pub(crate) fn new(table: &'a mut EventTable, name: String) -> Self {
        Self { table, name }
    }

    /// Append a middleware to this event's local chain.
    pub fn middleware(self, middleware: impl WsMessageMiddleware + 'static) -> Self {
        if let Some(entry) = self.table.entry_mut(&self.name) {
            entry.middlewares.push(Arc::new(middleware));
        }
        self
    }

    /// Exclude named global middlewares from running for this event.
    pub fn exclude_global<I: IntoIterator<Item = S>, S: Into<String>>(self, names: I) -> Self {
        if let Some(entry) = self.table.entry_mut(&self.name) {
            entry.excluded_global.extend(names.into_iter().map(Into::into));
        }
        self
    }

    /// Apply a dedicated rate-limit rule to this event.
    pub fn rate_limit(self, rule: RateLimitRule) -> Self {
        if let Some(entry) = self.table.entry_mut(&self.name) {
            entry.rate_limit = Some(rule);
        }
        self
    }
}

/// Entry point passed to [`Controller::register`], so a controller can group
/// several routes/events under one registration call without touching the
/// server's internals directly.
#[derive(Debug)]
pub struct Router<'a> {
    pub(crate) routes: &'a mut RouteTable,
    pub(crate) events: &'a mut EventTable,
}

impl<'a> Router<'a> {
    /// Register an HTTP route.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Fn(&Request) -> crate::error::Result<Response> + Send + Sync + 'static,
    ) -> RouteHandle<'_> {
        let index = self.routes.register(method, path, Arc::new(handler));
        RouteHandle::new(self.routes, index)
    }

    /// Register a WebSocket event handler.
    pub fn on_event(
        &mut self,
        name: &str,
        handler: impl Fn(crate::registry::ClientId, &serde_json::Value) -> crate::error::Result<()> + Send + Sync + 'static,
    ) -> EventHandle<'_> {
        self.events.register(name, Arc::new(handler));
        EventHandle::new(self.events, name.to_string())
    }
}

/// Groups a set of related routes/events so applications can register them
/// as one unit under a single type instead of a loose sequence of calls.
/// Sugar over [`Router`]; not a separate dispatch path.
pub trait Controller {
    /// Register this controller's routes/events onto `router`.
    fn register(&self, router: &mut Router<'_>);
}
