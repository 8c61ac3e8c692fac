//! Server configuration: the CLI/env surface from the component design, plus
//! the injected collaborators (`CorsPolicy`) the core leaves external.

use std::{env, net::IpAddr, path::PathBuf, time::Duration};

use crate::{protocol::FrameLimits, ratelimit::RateLimitRule};

/// Decides whether a cross-origin request/handshake is allowed.
///
/// Left as an injected collaborator rather than a fixed policy: applications
/// own their own CORS rules, the core only calls through this trait.
pub trait CorsPolicy: Send + Sync + std::fmt::Debug {
    /// Whether `origin` is allowed to talk to this server.
    fn allow_origin(&self, origin: &str) -> bool;
}

/// Permits every origin. The default when no policy is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAnyOrigin;

impl CorsPolicy for AllowAnyOrigin {
    fn allow_origin(&self, _origin: &str) -> bool {
        true
    }
}

/// Permits only a fixed, explicit set of origins.
#[derive(Debug, Clone, Default)]
pub struct AllowListOrigins(pub Vec<String>);

impl CorsPolicy for AllowListOrigins {
    fn allow_origin(&self, origin: &str) -> bool {
        self.0.iter().any(|allowed| allowed == origin)
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the listener to.
    pub host: IpAddr,
    /// Port to bind the listener to.
    pub port: u16,
    /// Verbose diagnostic logging (in addition to the `log` facade's own level filter).
    pub debug: bool,
    /// Whether the sliding-window rate limiter is enabled at all.
    pub rate_limit_enabled: bool,
    /// Shared secret required to connect, if set (checked during the handshake).
    pub auth_key: Option<String>,
    /// Path to the external newline-delimited-JSON broadcast queue file.
    pub queue_file: PathBuf,
    /// Whether to trust `proxy_headers` for determining client IPs (used by the
    /// rate limiter's per-IP scoping). Only enable behind a trusted reverse proxy.
    pub trust_proxy: bool,
    /// Header names consulted (in order) for the client IP when `trust_proxy` is set.
    pub proxy_headers: Vec<String>,
    /// Origins allowed to complete a WebSocket handshake. Empty means unrestricted.
    pub allowed_origins: Vec<String>,
    /// Upper bound on how long `mio::Poll::poll` blocks per iteration of the event loop.
    pub poll_timeout: Duration,
    /// How long an accepted connection may stay idle (no bytes either way) before closing.
    pub idle_timeout: Duration,
    /// How long a connection may spend sniffing/handshaking before closing.
    pub handshake_timeout: Duration,
    /// Per-client outbound buffer high-water mark, in bytes.
    pub backpressure_limit: usize,
    /// WebSocket frame/message limits.
    pub frame_limits: FrameLimits,
    /// Cross-origin policy collaborator.
    pub cors: std::sync::Arc<dyn CorsPolicy>,
    /// Default rule for the `global-http` rate-limit bucket, applied to every
    /// request in addition to any route-specific rule.
    pub global_http_rate_limit: RateLimitRule,
    /// Default rule for the `global-ws` rate-limit bucket, applied to every
    /// inbound message in addition to any event-specific rule.
    pub global_ws_rate_limit: RateLimitRule,
    /// How often the event loop sweeps stale rate-limit buckets.
    pub rate_limit_sweep_interval: Duration,
    /// The externally-advertised host clients should use to reach this server,
    /// when it differs from the bind host (behind a reverse proxy or NAT).
    pub client_host: Option<String>,
    /// The externally-advertised port clients should use to reach this server,
    /// when it differs from the bind port.
    pub client_port: Option<u16>,
    /// Secret salt mixed into broadcast/room tokens handed out to clients.
    pub broadcast_salt: Option<String>,
    /// How long an issued token remains valid.
    pub token_expiration: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8080,
            debug: false,
            rate_limit_enabled: true,
            auth_key: None,
            queue_file: PathBuf::from("/tmp/sockeon.queue"),
            trust_proxy: false,
            proxy_headers: vec!["X-Forwarded-For".to_string()],
            allowed_origins: Vec::new(),
            poll_timeout: Duration::from_millis(200),
            idle_timeout: Duration::from_secs(60),
            handshake_timeout: Duration::from_secs(10),
            backpressure_limit: 4 * 1024 * 1024,
            frame_limits: FrameLimits::default(),
            cors: std::sync::Arc::new(AllowAnyOrigin),
            global_http_rate_limit: RateLimitRule::new(120, Duration::from_secs(60)),
            global_ws_rate_limit: RateLimitRule::new(240, Duration::from_secs(60)),
            rate_limit_sweep_interval: Duration::from_secs(300),
            client_host: None,
            client_port: None,
            broadcast_salt: None,
            token_expiration: Duration::from_secs(3600),
        }
    }
}

impl ServerConfig {
    /// Set [`Self::host`] and [`Self::port`].
    pub fn bind(mut self, host: IpAddr, port: u16) -> Self {
        self.host = host;
        self.port = port;
        self
    }

    /// Set [`Self::debug`].
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set [`Self::auth_key`].
    pub fn auth_key(mut self, key: impl Into<String>) -> Self {
        self.auth_key = Some(key.into());
        self
    }

    /// Set [`Self::queue_file`].
    pub fn queue_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.queue_file = path.into();
        self
    }

    /// Set [`Self::cors`].
    pub fn cors(mut self, policy: impl CorsPolicy + 'static) -> Self {
        self.cors = std::sync::Arc::new(policy);
        self
    }

    /// Set [`Self::trust_proxy`].
    pub fn trust_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }

    /// Set [`Self::proxy_headers`].
    pub fn proxy_headers(mut self, headers: Vec<String>) -> Self {
        self.proxy_headers = headers;
        self
    }

    /// Set [`Self::broadcast_salt`].
    pub fn broadcast_salt(mut self, salt: impl Into<String>) -> Self {
        self.broadcast_salt = Some(salt.into());
        self
    }

    /// Set [`Self::token_expiration`].
    pub fn token_expiration(mut self, expiration: Duration) -> Self {
        self.token_expiration = expiration;
        self
    }

    /// Overlay the config-loader's `SOCKEON_*` environment variables onto this
    /// configuration: `SOCKEON_SERVER_HOST`, `SOCKEON_SERVER_PORT`,
    /// `SOCKEON_CLIENT_HOST`, `SOCKEON_CLIENT_PORT`, `SOCKEON_BROADCAST_SALT`
    /// and `SOCKEON_TOKEN_EXPIRATION` (seconds). Every other option (`debug`,
    /// `rateLimitConfig`, `authKey`, `queueFile`, `trustProxy`, `proxyHeaders`)
    /// is constructor/builder-only, not environment-driven. Unset or
    /// unparsable variables leave the existing value untouched.
    pub fn from_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("SOCKEON_SERVER_HOST") {
            if let Ok(host) = v.parse() {
                self.host = host;
            }
        }
        if let Ok(v) = env::var("SOCKEON_SERVER_PORT") {
            if let Ok(port) = v.parse() {
                self.port = port;
            }
        }
        if let Ok(v) = env::var("SOCKEON_CLIENT_HOST") {
            self.client_host = Some(v);
        }
        if let Ok(v) = env::var("SOCKEON_CLIENT_PORT") {
            if let Ok(port) = v.parse() {
                self.client_port = Some(port);
            }
        }
        if let Ok(v) = env::var("SOCKEON_BROADCAST_SALT") {
            self.broadcast_salt = Some(v);
        }
        if let Ok(v) = env::var("SOCKEON_TOKEN_EXPIRATION") {
            if let Ok(seconds) = v.parse() {
                self.token_expiration = Duration::from_secs(seconds);
            }
        }

        self
    }
}
