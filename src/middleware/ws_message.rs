//! WebSocket inbound-message middleware.

use crate::{error::Result, registry::ClientId};

/// Runs before an event handler, once per inbound WebSocket message.
pub trait WsMessageMiddleware: Send + Sync {
    /// Inspect or reject the message named `event` from `client` before the
    /// handler runs.
    fn before(&self, client: ClientId, event: &str, payload: &serde_json::Value) -> Result<()>;
}

impl<F> WsMessageMiddleware for F
where
    F: Fn(ClientId, &str, &serde_json::Value) -> Result<()> + Send + Sync,
{
    fn before(&self, client: ClientId, event: &str, payload: &serde_json::Value) -> Result<()> {
        self(client, event, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn closure_middleware_runs() {
        let calls = std::sync::Mutex::new(0);
        let mw = |_: ClientId, _: &str, _: &serde_json::Value| {
            *calls.lock().unwrap() += 1;
            Ok(())
        };

        mw.before(ClientId::from_raw(1), "chat:message", &json!({})).unwrap();
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
