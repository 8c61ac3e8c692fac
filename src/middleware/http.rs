//! HTTP request middleware.

use crate::{error::Result, http_proto::Request};

/// Runs before an HTTP route handler. Can mutate the (already-parsed)
/// request's extension data via `data`, or reject it by returning `Err`.
pub trait HttpMiddleware: Send + Sync {
    /// Inspect or reject `request` before the route handler runs.
    fn before(&self, request: &Request) -> Result<()>;
}

impl<F> HttpMiddleware for F
where
    F: Fn(&Request) -> Result<()> + Send + Sync,
{
    fn before(&self, request: &Request) -> Result<()> {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, HandlerError};

    #[test]
    fn closure_middleware_can_reject() {
        let mw: &dyn HttpMiddleware = &(|_: &Request| Err(Error::Handler(HandlerError::msg("nope"))));
        let (_, req) = Request::parse(b"GET / HTTP/1.1\r\n\r\n").unwrap().unwrap();
        assert!(mw.before(&req).is_err());
    }
}
