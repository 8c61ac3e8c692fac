//! Turning a parsed HTTP request or a decoded WebSocket text frame into a
//! response / set of handler side effects: rate limiting, middleware chain,
//! then the registered handler itself.

use std::{
    net::IpAddr,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::Error,
    http_proto::{Request, Response},
    middleware::{run_chain, HttpMiddleware, Named, WsMessageMiddleware},
    protocol::Message,
    ratelimit::{scope, RateLimitError, RateLimitRule, RateLimiter},
    registry::ClientId,
    route::{EventTable, RouteTable},
};

/// Build a JSON-bodied response, independent of the `Response::json`
/// constructor (which always answers `200`).
fn json_response(status: StatusCode, value: serde_json::Value) -> Response {
    Response {
        status,
        headers: http::HeaderMap::new(),
        body: serde_json::to_vec(&value).unwrap_or_default(),
    }
    .header(http::header::CONTENT_TYPE, http::HeaderValue::from_static("application/json"))
}

/// Build a `404 Not Found` JSON response for an unmatched route.
fn not_found() -> Response {
    error_body(StatusCode::NOT_FOUND, "not_found", "no route matches this request")
}

fn error_body(status: StatusCode, error: &str, message: &str) -> Response {
    json_response(status, serde_json::json!({ "error": error, "message": message })).with_security_headers()
}

fn error_response(err: &Error) -> Response {
    match err {
        Error::Validation(validation) => json_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            serde_json::json!({
                "error": "validation_error",
                "message": validation.message,
                "field": validation.field,
            }),
        )
        .with_security_headers(),
        Error::Handler(handler) => {
            log::error!("handler error: {}", handler.message);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
        }
        other => {
            log::error!("dispatch error: {other}");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
        }
    }
}

fn rate_limit_response(err: &RateLimitError, rule: &RateLimitRule) -> Response {
    let reset = SystemTime::now()
        .checked_add(err.retry_after)
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);

    json_response(
        StatusCode::TOO_MANY_REQUESTS,
        serde_json::json!({
            "error": "rate_limit_exceeded",
            "message": err.to_string(),
            "retry_after": err.retry_after.as_secs(),
            "limit": rule.max_events,
            "window": rule.window.as_secs(),
        }),
    )
    .header(http::HeaderName::from_static("x-ratelimit-limit"), http::HeaderValue::from(rule.max_events))
    .header(http::HeaderName::from_static("x-ratelimit-remaining"), http::HeaderValue::from_static("0"))
    .header(http::HeaderName::from_static("x-ratelimit-reset"), http::HeaderValue::from(reset))
    .header(http::header::RETRY_AFTER, http::HeaderValue::from(err.retry_after.as_secs()))
    .with_security_headers()
}

/// Resolve, rate-limit, run middleware for, and dispatch one HTTP request.
#[allow(clippy::too_many_arguments)]
pub fn dispatch_http(
    request: Request,
    routes: &RouteTable,
    global_mw: &[Named<dyn HttpMiddleware>],
    limiter: &mut RateLimiter,
    rate_limit_enabled: bool,
    global_rule: &RateLimitRule,
    ip: IpAddr,
    now: Instant,
) -> Response {
    let path = request.uri.path().to_string();

    let Some((route, params)) = routes.matches(&request.method, &path) else {
        return not_found();
    };

    if rate_limit_enabled {
        let route_scope = scope::route(&route.method, &path);
        if let Err(err) =
            limiter.check_layered(ip, scope::GLOBAL_HTTP, global_rule, &route_scope, route.rate_limit.as_ref(), now)
        {
            let rule = route.rate_limit.unwrap_or(*global_rule);
            return rate_limit_response(&err, &rule);
        }
    }

    let request = request.with_params(params);

    if let Err(err) =
        run_chain(global_mw, &route.middlewares, &route.excluded_global, &mut request.clone(), |mw, req| mw.before(req))
    {
        return error_response(&err);
    }

    match (route.handler)(&request) {
        Ok(response) => response.with_security_headers(),
        Err(err) => error_response(&err),
    }
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    data: Value,
}

/// Encode `{"event": event, "data": data}` as a text frame's wire bytes,
/// for replying directly to the sender (rate-limit/validation notices).
fn direct_reply(event: &str, data: Value) -> Vec<u8> {
    let text = serde_json::to_string(&serde_json::json!({ "event": event, "data": data })).unwrap_or_default();
    let mut buf = Vec::new();
    let _ = Message::Text(text).into_frame().into_buf(&mut buf);
    buf
}

/// Parse, rate-limit, run middleware for, and dispatch one inbound WebSocket
/// text frame. Returns encoded frame bytes to write back to the sender only
/// (a `rate_limit_exceeded` or `validation_error` notice); `None` covers both
/// "silently dropped" and "handled without a direct reply".
#[allow(clippy::too_many_arguments)]
pub fn dispatch_ws_event(
    client: ClientId,
    ip: IpAddr,
    text: &str,
    events: &EventTable,
    global_mw: &[Named<dyn WsMessageMiddleware>],
    limiter: &mut RateLimiter,
    rate_limit_enabled: bool,
    global_rule: &RateLimitRule,
    now: Instant,
) -> Option<Vec<u8>> {
    let Ok(envelope) = serde_json::from_str::<Envelope>(text) else {
        log::debug!("dropping structurally invalid WS message from {client}");
        return None;
    };

    let Some(entry) = events.get(&envelope.event) else {
        log::debug!("dropping message for unknown event '{}' from {client}", envelope.event);
        return None;
    };

    if rate_limit_enabled {
        let event_scope = scope::event(&envelope.event);
        if limiter.check_layered(ip, scope::GLOBAL_WS, global_rule, &event_scope, entry.rate_limit.as_ref(), now).is_err()
        {
            return Some(direct_reply(
                "rate_limit_exceeded",
                serde_json::json!({ "event": envelope.event }),
            ));
        }
    }

    if let Err(err) = run_chain(global_mw, &entry.middlewares, &entry.excluded_global, &mut (), |mw, _| {
        mw.before(client, &envelope.event, &envelope.data)
    }) {
        return reply_for_error(&err);
    }

    if let Err(err) = (entry.handler)(client, &envelope.data) {
        return reply_for_error(&err);
    }

    None
}

fn reply_for_error(err: &Error) -> Option<Vec<u8>> {
    match err {
        Error::Validation(validation) => Some(direct_reply(
            "validation_error",
            serde_json::json!({ "message": validation.message, "field": validation.field }),
        )),
        Error::Handler(handler) => {
            log::error!("WS handler error: {}", handler.message);
            None
        }
        other => {
            log::error!("WS dispatch error: {other}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    use http::Method;

    use super::*;
    use crate::{error::HandlerError, route::EventTable};

    fn ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    #[test]
    fn unmatched_route_returns_404() {
        let routes = RouteTable::new();
        let mut limiter = RateLimiter::new();
        let request = Request::parse(b"GET /nope HTTP/1.1\r\n\r\n").unwrap().unwrap().1;

        let rule = RateLimitRule::new(100, std::time::Duration::from_secs(1));
        let response =
            dispatch_http(request, &routes, &[], &mut limiter, true, &rule, ip(), Instant::now());
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn matched_route_runs_handler_and_applies_security_headers() {
        let mut routes = RouteTable::new();
        routes.register(Method::GET, "/health", Arc::new(|_: &Request| Ok(Response::text("ok"))));
        let mut limiter = RateLimiter::new();
        let request = Request::parse(b"GET /health HTTP/1.1\r\n\r\n").unwrap().unwrap().1;

        let rule = RateLimitRule::new(100, std::time::Duration::from_secs(1));
        let response =
            dispatch_http(request, &routes, &[], &mut limiter, true, &rule, ip(), Instant::now());
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.headers.contains_key("x-content-type-options"));
    }

    #[test]
    fn handler_error_becomes_500() {
        let mut routes = RouteTable::new();
        routes.register(
            Method::GET,
            "/boom",
            Arc::new(|_: &Request| Err(Error::Handler(HandlerError::msg("boom")))),
        );
        let mut limiter = RateLimiter::new();
        let request = Request::parse(b"GET /boom HTTP/1.1\r\n\r\n").unwrap().unwrap().1;

        let rule = RateLimitRule::new(100, std::time::Duration::from_secs(1));
        let response =
            dispatch_http(request, &routes, &[], &mut limiter, true, &rule, ip(), Instant::now());
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unstructured_ws_message_is_dropped() {
        let events = EventTable::new();
        let mut limiter = RateLimiter::new();
        let rule = RateLimitRule::new(100, std::time::Duration::from_secs(1));

        let reply = dispatch_ws_event(
            ClientId::from_raw(1),
            ip(),
            "not json",
            &events,
            &[],
            &mut limiter,
            true,
            &rule,
            Instant::now(),
        );
        assert!(reply.is_none());
    }

    #[test]
    fn unknown_event_is_dropped() {
        let events = EventTable::new();
        let mut limiter = RateLimiter::new();
        let rule = RateLimitRule::new(100, std::time::Duration::from_secs(1));

        let reply = dispatch_ws_event(
            ClientId::from_raw(1),
            ip(),
            r#"{"event":"nope","data":{}}"#,
            &events,
            &[],
            &mut limiter,
            true,
            &rule,
            Instant::now(),
        );
        assert!(reply.is_none());
    }

    #[test]
    fn known_event_invokes_its_handler() {
        let mut events = EventTable::new();
        let seen = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let seen2 = seen.clone();
        events.register("chat:message", Arc::new(move |_, _| {
            seen2.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }));

        let mut limiter = RateLimiter::new();
        let rule = RateLimitRule::new(100, std::time::Duration::from_secs(1));

        let reply = dispatch_ws_event(
            ClientId::from_raw(1),
            ip(),
            r#"{"event":"chat:message","data":{"text":"hi"}}"#,
            &events,
            &[],
            &mut limiter,
            true,
            &rule,
            Instant::now(),
        );
        assert!(reply.is_none());
        assert!(seen.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn exceeding_the_event_rate_limit_replies_with_rate_limit_exceeded() {
        let mut events = EventTable::new();
        events.register("ping", Arc::new(|_, _| Ok(())));

        let mut limiter = RateLimiter::new();
        let rule = RateLimitRule::new(1, std::time::Duration::from_secs(1));
        let now = Instant::now();

        let first = dispatch_ws_event(
            ClientId::from_raw(1),
            ip(),
            r#"{"event":"ping","data":null}"#,
            &events,
            &[],
            &mut limiter,
            true,
            &rule,
            now,
        );
        assert!(first.is_none());

        let second = dispatch_ws_event(
            ClientId::from_raw(1),
            ip(),
            r#"{"event":"ping","data":null}"#,
            &events,
            &[],
            &mut limiter,
            true,
            &rule,
            now,
        );
        assert!(second.is_some());
    }
}
