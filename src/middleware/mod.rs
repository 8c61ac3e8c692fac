//! Ordered middleware chains for the three dispatch stacks: HTTP requests,
//! inbound WebSocket messages and the WebSocket handshake.
//!
//! Each middleware runs in registration order and can abort the chain by
//! returning `Err`; a global chain always runs before a per-route/per-event
//! chain unless the target opted out via its exclusion list.

mod handshake;
mod http;
mod ws_message;

pub use handshake::HandshakeMiddleware;
pub use http::HttpMiddleware;
pub use ws_message::WsMessageMiddleware;

use std::sync::Arc;

/// A named, shared middleware handle, so route/event builders can record
/// which global middlewares a target wants to exclude by name.
#[derive(Clone)]
pub struct Named<T: ?Sized> {
    /// The name this middleware is registered and excluded under.
    pub name: String,
    /// The middleware itself.
    pub middleware: Arc<T>,
}

impl<T: ?Sized> std::fmt::Debug for Named<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Named").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Run `global` then `local` in order, skipping any global middleware whose
/// name is in `excluded`, short-circuiting on the first error.
pub(crate) fn run_chain<T: ?Sized, Ctx>(
    global: &[Named<T>],
    local: &[Arc<T>],
    excluded: &[String],
    ctx: &mut Ctx,
    call: impl Fn(&T, &mut Ctx) -> crate::error::Result<()>,
) -> crate::error::Result<()> {
    for entry in global {
        if excluded.iter().any(|n| n == &entry.name) {
            continue;
        }
        call(&entry.middleware, ctx)?;
    }

    for middleware in local {
        call(middleware, ctx)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Result as CrateResult, http_proto::Request};
    use std::sync::{Arc, Mutex};

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl HttpMiddleware for Recording {
        fn before(&self, _request: &Request) -> CrateResult<()> {
            self.log.lock().unwrap().push(self.name);
            Ok(())
        }
    }

    fn named(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Named<dyn HttpMiddleware> {
        Named { name: name.to_string(), middleware: Arc::new(Recording { name, log: log.clone() }) }
    }

    #[test]
    fn excluded_global_middleware_is_skipped_but_the_rest_of_the_chain_still_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let g1 = named("g1", &log);
        let g2 = named("g2", &log);
        let global = vec![g1, g2];

        let r1: Arc<dyn HttpMiddleware> = Arc::new(Recording { name: "r1", log: log.clone() });
        let local = vec![r1];

        let excluded = vec!["g1".to_string()];
        let (_, request) = Request::parse(b"GET / HTTP/1.1\r\n\r\n").unwrap().unwrap();

        run_chain(&global, &local, &excluded, &mut request.clone(), |mw, req| mw.before(req)).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["g2", "r1"]);
    }

    #[test]
    fn a_failing_global_middleware_stops_the_chain_before_local_middleware_runs() {
        struct Rejecting;
        impl HttpMiddleware for Rejecting {
            fn before(&self, _request: &Request) -> CrateResult<()> {
                Err(crate::error::Error::Handler(crate::error::HandlerError::msg("rejected")))
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let global: Vec<Named<dyn HttpMiddleware>> =
            vec![Named { name: "reject".to_string(), middleware: Arc::new(Rejecting) }];
        let local: Vec<Arc<dyn HttpMiddleware>> = vec![Arc::new(Recording { name: "never-runs", log: log.clone() })];

        let (_, request) = Request::parse(b"GET / HTTP/1.1\r\n\r\n").unwrap().unwrap();
        let result = run_chain(&global, &local, &[], &mut request.clone(), |mw, req| mw.before(req));

        assert!(result.is_err());
        assert!(log.lock().unwrap().is_empty());
    }
}
