//! The single-threaded, edge-triggered accept/read/write/dispatch loop.
//!
//! One `mio::Poll` instance multiplexes the listener and every accepted
//! connection on one OS thread: there is no per-connection thread or task,
//! so a slow handler blocks every other client on it. Applications are
//! expected to keep handlers non-blocking, the same assumption the rest of
//! this crate's design makes.

use std::{
    io::{Read, Write},
    net::SocketAddr,
    time::Instant,
};

use mio::{
    net::{TcpListener, TcpStream},
    Events, Interest, Poll, Token,
};

use crate::{
    config::ServerConfig,
    error::Result,
    handshake,
    membership::Store,
    middleware::{HandshakeMiddleware, HttpMiddleware, Named, WsMessageMiddleware},
    protocol::{
        frame::{decode, Decoded},
        Message,
    },
    queue::QueueReader,
    ratelimit::RateLimiter,
    registry::{ClientId, ClientType, Connection, Registry},
    route::{EventTable, RouteTable},
    server::{
        context::{Command, Handle},
        dispatch::{dispatch_http, dispatch_ws_event},
        sniff::{self, Sniff},
    },
    util::NonBlockingResult,
};

/// The three global middleware chains, handed to the event loop once at
/// startup; route/event-local chains live inside `RouteTable`/`EventTable`.
#[derive(Default)]
pub(crate) struct GlobalMiddleware {
    pub http: Vec<Named<dyn HttpMiddleware>>,
    pub ws: Vec<Named<dyn WsMessageMiddleware>>,
    pub handshake: Vec<Named<dyn HandshakeMiddleware>>,
}

const LISTENER: Token = Token(usize::MAX);

/// Hooks an embedding application can register for connection lifecycle events.
#[derive(Default)]
pub(crate) struct Hooks {
    pub on_connect: Option<Box<dyn Fn(ClientId, SocketAddr) + Send + Sync>>,
    pub on_disconnect: Option<Box<dyn Fn(ClientId) + Send + Sync>>,
}

/// Owns every piece of mutable server state and drives the event loop.
pub(crate) struct EventLoop {
    config: ServerConfig,
    poll: Poll,
    listener: TcpListener,
    registry: Registry<TcpStream>,
    membership: Store,
    routes: RouteTable,
    events: EventTable,
    middleware: GlobalMiddleware,
    limiter: RateLimiter,
    queue: QueueReader,
    handle: Handle,
    hooks: Hooks,
    last_sweep: Instant,
    shutting_down: bool,
}

fn client_ip(addr: SocketAddr) -> std::net::IpAddr {
    addr.ip()
}

impl EventLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn bind(
        config: ServerConfig,
        routes: RouteTable,
        events: EventTable,
        middleware: GlobalMiddleware,
        hooks: Hooks,
        handle: Handle,
        limiter: RateLimiter,
    ) -> Result<Self> {
        let addr = SocketAddr::new(config.host, config.port);
        let mut listener = TcpListener::bind(addr)?;

        let poll = Poll::new()?;
        poll.registry().register(&mut listener, LISTENER, Interest::READABLE)?;

        Ok(Self {
            queue: QueueReader::new(config.queue_file.clone()),
            last_sweep: Instant::now(),
            config,
            poll,
            listener,
            registry: Registry::new(),
            membership: Store::new(),
            routes,
            events,
            middleware,
            limiter,
            handle,
            hooks,
            shutting_down: false,
        })
    }

    /// Run until a `Shutdown` command is processed.
    pub fn run(&mut self) -> Result<()> {
        let mut mio_events = Events::with_capacity(256);

        loop {
            if self.shutting_down && self.registry.is_empty() {
                return Ok(());
            }

            self.poll.poll(&mut mio_events, Some(self.config.poll_timeout))?;

            for event in mio_events.iter() {
                if event.token() == LISTENER {
                    self.accept_all()?;
                    continue;
                }

                let id = ClientId::from_raw(event.token().0 as u64);
                if event.is_readable() {
                    self.readable(id);
                }
                if event.is_writable() {
                    self.writable(id);
                }
            }

            self.apply_commands();
            self.run_housekeeping();
            self.reregister_interests();
        }
    }

    fn accept_all(&mut self) -> Result<()> {
        loop {
            match self.listener.accept().no_block()? {
                Some((mut stream, addr)) => {
                    let id = self.registry.reserve_id();
                    let token = Token(id.as_raw() as usize);
                    self.poll.registry().register(&mut stream, token, Interest::READABLE)?;

                    let connection = Connection::new(
                        stream,
                        addr,
                        self.config.frame_limits.max_continuation_frames,
                        self.config.frame_limits.max_message_size,
                    );
                    self.registry.insert(id, connection);
                    self.membership.register(id);
                }
                None => return Ok(()),
            }
        }
    }

    fn readable(&mut self, id: ClientId) {
        let mut chunk = [0u8; 16 * 1024];
        loop {
            let Some(connection) = self.registry.get_mut(id) else { return };
            match connection.stream.read(&mut chunk).no_block() {
                Ok(Some(0)) => {
                    self.close_client(id);
                    return;
                }
                Ok(Some(n)) => {
                    connection.inbound.extend_from_slice(&chunk[..n]);
                    connection.touch();
                }
                Ok(None) => break,
                Err(e) => {
                    log::debug!("{id} read error: {e}");
                    self.close_client(id);
                    return;
                }
            }
        }

        if let Err(err) = self.process_inbound(id) {
            log::debug!("{id} protocol error: {err}");
            self.close_client(id);
        }
    }

    fn process_inbound(&mut self, id: ClientId) -> Result<()> {
        let Some(connection) = self.registry.get(id) else { return Ok(()) };
        let client_type = connection.client_type;

        match client_type {
            ClientType::Unknown => self.sniff_client(id),
            ClientType::Http => self.drive_http(id),
            ClientType::Ws => self.drive_ws(id),
        }
    }

    fn sniff_client(&mut self, id: ClientId) -> Result<()> {
        let Some(connection) = self.registry.get(id) else { return Ok(()) };

        match sniff::sniff(&connection.inbound, &self.config.allowed_origins) {
            Sniff::Incomplete => Ok(()),
            Sniff::Http => {
                let connection = self.registry.get_mut(id).expect("just looked up");
                connection.client_type = ClientType::Http;
                self.drive_http(id)
            }
            Sniff::Upgrade { consumed, request, key } => {
                if let Err(err) = self.middleware.handshake.iter().try_for_each(|mw| mw.middleware.before(&request)) {
                    let status = sniff::reject_status(&err);
                    let response = crate::http_proto::Response::with_status(status).into_bytes()?;
                    let connection = self.registry.get_mut(id).expect("just looked up");
                    connection.inbound.drain(..consumed);
                    connection.outbound.extend_from_slice(&response);
                    connection.closing = true;
                    return Ok(());
                }

                let response = handshake::format_accept_response(&key)?;
                let connection = self.registry.get_mut(id).expect("just looked up");
                connection.inbound.drain(..consumed);
                connection.outbound.extend_from_slice(&response);
                connection.client_type = ClientType::Ws;
                connection.handshake_done = true;
                let peer = connection.peer_addr;

                if let Some(on_connect) = &self.hooks.on_connect {
                    on_connect(id, peer);
                }
                Ok(())
            }
            Sniff::Reject(err) => {
                let status = sniff::reject_status(&err);
                let response = crate::http_proto::Response::with_status(status).into_bytes()?;
                let connection = self.registry.get_mut(id).expect("just looked up");
                connection.outbound.extend_from_slice(&response);
                connection.closing = true;
                Ok(())
            }
        }
    }

    fn drive_http(&mut self, id: ClientId) -> Result<()> {
        loop {
            let Some(connection) = self.registry.get(id) else { return Ok(()) };
            let peer = connection.peer_addr;

            let Some((consumed, request)) = crate::http_proto::Request::parse(&connection.inbound)? else {
                return Ok(());
            };

            let ip = self.proxy_ip(peer, &request);
            let now = Instant::now();
            let global_rule = self.config.global_http_rate_limit;
            let response = dispatch_http(
                request,
                &self.routes,
                &self.middleware.http,
                &mut self.limiter,
                self.config.rate_limit_enabled,
                &global_rule,
                ip,
                now,
            );

            let connection = self.registry.get_mut(id).expect("just looked up");
            connection.inbound.drain(..consumed);
            connection.outbound.extend_from_slice(&response.into_bytes()?);
            connection.closing = true;
        }
    }

    fn drive_ws(&mut self, id: ClientId) -> Result<()> {
        loop {
            let Some(connection) = self.registry.get(id) else { return Ok(()) };
            let Decoded { frames, residual } = decode(&connection.inbound, &self.config.frame_limits, true)?;
            if frames.is_empty() {
                return Ok(());
            }

            let consumed = connection.inbound.len() - residual.len();
            let peer = connection.peer_addr;

            for frame in frames {
                let Some(connection) = self.registry.get_mut(id) else { return Ok(()) };
                let message = match connection.assembler.push(frame) {
                    Ok(Some(m)) => m,
                    Ok(None) => continue,
                    Err(err) => return Err(err),
                };
                self.handle_ws_message(id, peer, message)?;
            }

            if let Some(connection) = self.registry.get_mut(id) {
                connection.inbound.drain(..consumed);
            }
        }
    }

    fn handle_ws_message(&mut self, id: ClientId, peer: SocketAddr, message: Message) -> Result<()> {
        match message {
            Message::Text(text) => {
                let ip = client_ip(peer);
                let now = Instant::now();
                let global_rule = self.config.global_ws_rate_limit;
                let reply = dispatch_ws_event(
                    id,
                    ip,
                    &text,
                    &self.events,
                    &self.middleware.ws,
                    &mut self.limiter,
                    self.config.rate_limit_enabled,
                    &global_rule,
                    now,
                );
                if let (Some(bytes), Some(connection)) = (reply, self.registry.get_mut(id)) {
                    connection.outbound.extend_from_slice(&bytes);
                }
            }
            Message::Binary(_) => {
                log::debug!("dropping binary WS message from {id}, no binary event surface");
            }
            Message::Ping(payload) => {
                let mut bytes = Vec::new();
                Message::Pong(payload).into_frame().into_buf(&mut bytes)?;
                if let Some(connection) = self.registry.get_mut(id) {
                    connection.outbound.extend_from_slice(&bytes);
                }
            }
            Message::Pong(_) => {}
            Message::Close(_) => {
                self.close_gracefully(id, crate::protocol::frame::codec::CloseCode::Normal, "bye");
            }
        }
        Ok(())
    }

    fn writable(&mut self, id: ClientId) {
        let Some(connection) = self.registry.get_mut(id) else { return };
        if connection.outbound.is_empty() {
            return;
        }

        match connection.stream.write(&connection.outbound).no_block() {
            Ok(Some(0)) | Ok(None) => {}
            Ok(Some(n)) => {
                connection.outbound.drain(..n);
                connection.touch();
            }
            Err(e) => {
                log::debug!("{id} write error: {e}");
                self.close_client(id);
                return;
            }
        }

        if connection.closing && connection.outbound.is_empty() {
            self.close_client(id);
        }
    }

    fn close_gracefully(&mut self, id: ClientId, code: crate::protocol::frame::codec::CloseCode, reason: &str) {
        let mut bytes = Vec::new();
        if Message::Close(Some((code.into(), reason.to_string()))).into_frame().into_buf(&mut bytes).is_ok() {
            if let Some(connection) = self.registry.get_mut(id) {
                connection.outbound.extend_from_slice(&bytes);
                connection.closing = true;
            }
        }
    }

    fn close_client(&mut self, id: ClientId) {
        let handshake_done = self.registry.get(id).is_some_and(|c| c.handshake_done);

        if let Some(mut connection) = self.registry.remove(id) {
            let _ = self.poll.registry().deregister(&mut connection.stream);
        }
        self.membership.cleanup(id);

        if handshake_done {
            if let Some(on_disconnect) = &self.hooks.on_disconnect {
                on_disconnect(id);
            }
        }
    }

    fn proxy_ip(&self, peer: SocketAddr, request: &crate::http_proto::Request) -> std::net::IpAddr {
        if !self.config.trust_proxy {
            return peer.ip();
        }
        for header in &self.config.proxy_headers {
            if let Some(value) = request.headers.get(header.as_str()).and_then(|v| v.to_str().ok()) {
                if let Some(first) = value.split(',').next() {
                    if let Ok(ip) = first.trim().parse() {
                        return ip;
                    }
                }
            }
        }
        peer.ip()
    }

    fn apply_commands(&mut self) {
        for command in self.handle.drain() {
            match command {
                Command::Broadcast { target, event, data } => {
                    if let Err(err) = crate::broadcast::broadcast_event(&mut self.registry, &self.membership, &target, &event, &data) {
                        log::warn!("broadcast failed: {err}");
                    }
                }
                Command::JoinNamespace { client, namespace } => self.membership.join_namespace(client, &namespace),
                Command::JoinRoom { client, room } => self.membership.join_room(client, &room),
                Command::LeaveRoom { client, room } => self.membership.leave_room(client, &room),
                Command::Disconnect { client } => {
                    self.close_gracefully(client, crate::protocol::frame::codec::CloseCode::Normal, "disconnected");
                }
                Command::Shutdown => self.begin_shutdown(),
            }
        }
    }

    fn begin_shutdown(&mut self) {
        self.shutting_down = true;
        let ids: Vec<_> = self.registry.ids().collect();
        for id in ids {
            self.close_gracefully(id, crate::protocol::frame::codec::CloseCode::Away, "server shutting down");
        }
    }

    fn run_housekeeping(&mut self) {
        let now = Instant::now();
        self.enforce_timeouts(now);

        if now.duration_since(self.last_sweep) >= self.config.rate_limit_sweep_interval {
            self.limiter.sweep(now, self.config.rate_limit_sweep_interval);
            self.last_sweep = now;
        }

        match self.queue.drain() {
            Ok(entries) => {
                for entry in entries {
                    let target = entry.target();
                    if let Err(err) =
                        crate::broadcast::broadcast_event(&mut self.registry, &self.membership, &target, &entry.event, &entry.data)
                    {
                        log::warn!("queue broadcast failed: {err}");
                    }
                }
            }
            Err(err) => log::warn!("failed to drain broadcast queue: {err}"),
        }
    }

    fn enforce_timeouts(&mut self, now: Instant) {
        let mut to_close = Vec::new();
        for id in self.registry.ids().collect::<Vec<_>>() {
            let Some(connection) = self.registry.get(id) else { continue };
            let idle_for = now.duration_since(connection.last_active);

            let timeout = match connection.client_type {
                ClientType::Unknown => self.config.handshake_timeout,
                ClientType::Http => self.config.handshake_timeout,
                ClientType::Ws => self.config.idle_timeout,
            };

            if idle_for > timeout {
                to_close.push(id);
            } else if connection.outbound.len() > self.config.backpressure_limit {
                to_close.push(id);
            }
        }

        for id in to_close {
            if let Some(connection) = self.registry.get(id) {
                if connection.client_type == ClientType::Ws && connection.outbound.len() > self.config.backpressure_limit {
                    self.close_gracefully(id, crate::protocol::frame::codec::CloseCode::MessageTooBig, "message too big");
                    continue;
                }
            }
            self.close_client(id);
        }
    }

    fn reregister_interests(&mut self) {
        for id in self.registry.ids().collect::<Vec<_>>() {
            let Some(connection) = self.registry.get_mut(id) else { continue };
            let interest = if connection.outbound.is_empty() {
                Interest::READABLE
            } else {
                Interest::READABLE | Interest::WRITABLE
            };
            let token = Token(id.as_raw() as usize);
            let _ = self.poll.registry().reregister(&mut connection.stream, token, interest);
        }
    }
}

