//! WebSocket handshake middleware.

use crate::{error::Result, handshake::HandshakeRequest};

/// Runs after the handshake request passes RFC 6455 validation but before the
/// `101` response is sent. Typically used for auth-key checks or connection
/// admission control.
pub trait HandshakeMiddleware: Send + Sync {
    /// Inspect or reject the upgrade request.
    fn before(&self, request: &HandshakeRequest) -> Result<()>;
}

impl<F> HandshakeMiddleware for F
where
    F: Fn(&HandshakeRequest) -> Result<()> + Send + Sync,
{
    fn before(&self, request: &HandshakeRequest) -> Result<()> {
        self(request)
    }
}
