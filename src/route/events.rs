//! The WebSocket event table: `on_event("name", handler)` registrations.

use std::{collections::HashMap, sync::Arc};

use crate::{
    error::Result,
    middleware::WsMessageMiddleware,
    ratelimit::RateLimitRule,
    registry::ClientId,
};

/// A WebSocket event handler: receives the sending client and the decoded
/// JSON payload.
pub type EventHandler = Arc<dyn Fn(ClientId, &serde_json::Value) -> Result<()> + Send + Sync>;

/// One registered event.
pub struct EventEntry {
    pub(crate) handler: EventHandler,
    pub(crate) middlewares: Vec<Arc<dyn WsMessageMiddleware>>,
    pub(crate) excluded_global: Vec<String>,
    pub(crate) rate_limit: Option<RateLimitRule>,
}

impl std::fmt::Debug for EventEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEntry").finish_non_exhaustive()
    }
}

/// The full set of registered WebSocket events.
#[derive(Debug, Default)]
pub struct EventTable {
    events: HashMap<String, EventEntry>,
}

impl EventTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event handler under `name`, overwriting any previous
    /// registration for the same name.
    pub fn register(&mut self, name: &str, handler: EventHandler) {
        self.events.insert(
            name.to_string(),
            EventEntry { handler, middlewares: Vec::new(), excluded_global: Vec::new(), rate_limit: None },
        );
    }

    /// Mutably access a previously registered event by name.
    pub fn entry_mut(&mut self, name: &str) -> Option<&mut EventEntry> {
        self.events.get_mut(name)
    }

    /// Look up a registered event.
    pub fn get(&self, name: &str) -> Option<&EventEntry> {
        self.events.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registers_and_looks_up_by_name() {
        let mut table = EventTable::new();
        table.register("chat:message", Arc::new(|_, _| Ok(())));

        assert!(table.get("chat:message").is_some());
        assert!(table.get("chat:unknown").is_none());
    }

    #[test]
    fn re_registering_overwrites_the_previous_handler() {
        let mut table = EventTable::new();
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let c1 = calls.clone();
        table.register("ping", Arc::new(move |_, _| {
            c1.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }));

        let c2 = calls.clone();
        table.register("ping", Arc::new(move |_, _| {
            c2.fetch_add(10, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }));

        (table.get("ping").unwrap().handler)(crate::registry::ClientId::from_raw(0), &json!({})).unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 10);
    }
}
