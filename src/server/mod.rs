//! The public, embeddable server.
//!
//! [`Server`] wires a [`ServerConfig`] together with the route/event tables,
//! the three global middleware chains, and connection-lifecycle hooks, then
//! hands all of it to the [`event_loop::EventLoop`] when [`Server::run`] is
//! called. Everything up to that point is just assembling owned state; no
//! socket is touched until the loop starts.

mod context;
mod dispatch;
mod event_loop;
mod sniff;

pub use context::Handle;

use std::{net::IpAddr, sync::Arc};

use http::Method;

use crate::{
    config::ServerConfig,
    error::Result,
    http_proto::{Request, Response},
    middleware::{HandshakeMiddleware, HttpMiddleware, Named, WsMessageMiddleware},
    ratelimit::RateLimiter,
    registry::ClientId,
    route::{Controller, EventHandle, EventTable, Router, RouteHandle, RouteTable},
};
use event_loop::{EventLoop, GlobalMiddleware, Hooks};

/// A combined WebSocket + HTTP application server.
///
/// Build one from a [`ServerConfig`], register routes, events, middleware
/// and lifecycle hooks, then call [`Server::run`] to bind the listener and
/// block the calling thread running the event loop.
pub struct Server {
    config: ServerConfig,
    routes: RouteTable,
    events: EventTable,
    middleware: GlobalMiddleware,
    hooks: Hooks,
    limiter: RateLimiter,
    handle: Handle,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("routes", &self.routes)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Build a server from `config`, with empty route/event tables and no
    /// middleware or hooks registered yet.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            routes: RouteTable::new(),
            events: EventTable::new(),
            middleware: GlobalMiddleware::default(),
            hooks: Hooks::default(),
            limiter: RateLimiter::new(),
            handle: Handle::new(),
        }
    }

    /// Register an HTTP route.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    ) -> RouteHandle<'_> {
        let index = self.routes.register(method, path, Arc::new(handler));
        RouteHandle::new(&mut self.routes, index)
    }

    /// Register a WebSocket event handler.
    pub fn on_event(
        &mut self,
        name: &str,
        handler: impl Fn(ClientId, &serde_json::Value) -> Result<()> + Send + Sync + 'static,
    ) -> EventHandle<'_> {
        self.events.register(name, Arc::new(handler));
        EventHandle::new(&mut self.events, name.to_string())
    }

    /// Register every route/event a [`Controller`] groups together.
    pub fn register_controller(&mut self, controller: &impl Controller) -> &mut Self {
        let mut router = Router { routes: &mut self.routes, events: &mut self.events };
        controller.register(&mut router);
        self
    }

    /// Append a global HTTP middleware, identified by `name` so individual
    /// routes can opt out of it via `RouteHandle::exclude_global`.
    pub fn use_http_middleware(&mut self, name: impl Into<String>, middleware: impl HttpMiddleware + 'static) -> &mut Self {
        self.middleware.http.push(Named { name: name.into(), middleware: Arc::new(middleware) });
        self
    }

    /// Append a global WebSocket message middleware.
    pub fn use_ws_middleware(&mut self, name: impl Into<String>, middleware: impl WsMessageMiddleware + 'static) -> &mut Self {
        self.middleware.ws.push(Named { name: name.into(), middleware: Arc::new(middleware) });
        self
    }

    /// Append a global handshake middleware, run against every upgrade
    /// request before the `101` response is sent.
    pub fn use_handshake_middleware(&mut self, name: impl Into<String>, middleware: impl HandshakeMiddleware + 'static) -> &mut Self {
        self.middleware.handshake.push(Named { name: name.into(), middleware: Arc::new(middleware) });
        self
    }

    /// Run `hook` with the id and address of every newly accepted connection.
    pub fn on_connect(&mut self, hook: impl Fn(ClientId, std::net::SocketAddr) + Send + Sync + 'static) -> &mut Self {
        self.hooks.on_connect = Some(Box::new(hook));
        self
    }

    /// Run `hook` with the id of every connection right before it's removed
    /// from the registry.
    pub fn on_disconnect(&mut self, hook: impl Fn(ClientId) + Send + Sync + 'static) -> &mut Self {
        self.hooks.on_disconnect = Some(Box::new(hook));
        self
    }

    /// Exempt `ip` from every rate-limit bucket.
    pub fn whitelist_ip(&mut self, ip: IpAddr) -> &mut Self {
        self.limiter.whitelist(ip);
        self
    }

    /// A cheaply cloneable, non-owning reference to this server, for
    /// capturing in route/event handlers before [`Server::run`] takes
    /// ownership of `self`.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Bind the listener and run the event loop, blocking the calling
    /// thread until a `Shutdown` command (queued through a [`Handle`]) has
    /// drained every connection.
    pub fn run(self) -> Result<()> {
        let Server { config, routes, events, middleware, hooks, limiter, handle } = self;
        EventLoop::bind(config, routes, events, middleware, hooks, handle, limiter)?.run()
    }

    /// Queue a cooperative shutdown, equivalent to `self.handle().shutdown()`.
    pub fn shutdown(&self) {
        self.handle.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_and_event_registration_do_not_panic() {
        let mut server = Server::new(ServerConfig::default().bind(IpAddr::from([127, 0, 0, 1]), 0));
        server.route(Method::GET, "/health", |_| Ok(Response::text("ok")));
        server.on_event("ping", |_, _| Ok(()));
        server.on_connect(|_, _| {});
        server.on_disconnect(|_| {});
        server.whitelist_ip(IpAddr::from([127, 0, 0, 1]));
    }

    #[test]
    fn handle_survives_detached_from_the_server() {
        let server = Server::new(ServerConfig::default());
        let handle = server.handle();
        handle.disconnect(ClientId::from_raw(0));
    }
}
