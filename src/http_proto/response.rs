//! HTTP/1.1 response building and formatting.

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;

use crate::error::Result;

/// An HTTP response under construction or ready to be written out.
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// An empty response with the given status.
    pub fn with_status(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: Vec::new() }
    }

    /// A `200 OK` plain-text response.
    pub fn text(body: impl Into<String>) -> Self {
        let mut res = Self::with_status(StatusCode::OK);
        res.headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        res.body = body.into().into_bytes();
        res
    }

    /// A `200 OK` response serializing `value` as JSON.
    pub fn json(value: &impl Serialize) -> Result<Self> {
        let mut res = Self::with_status(StatusCode::OK);
        res.headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        res.body = serde_json::to_vec(value)?;
        Ok(res)
    }

    /// Set the status code, builder-style.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Insert a header, builder-style.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Apply the standard security headers (`X-Content-Type-Options`,
    /// `X-Frame-Options`, `X-XSS-Protection`) if not already set.
    pub fn with_security_headers(mut self) -> Self {
        self.headers.entry(HeaderName::from_static("x-content-type-options")).or_insert(HeaderValue::from_static("nosniff"));
        self.headers.entry(HeaderName::from_static("x-frame-options")).or_insert(HeaderValue::from_static("SAMEORIGIN"));
        self.headers
            .entry(HeaderName::from_static("x-xss-protection"))
            .or_insert(HeaderValue::from_static("1; mode=block"));
        self
    }

    /// Apply a CORS allow-origin header for `origin`.
    pub fn with_cors(mut self, origin: &str) -> Result<Self> {
        self.headers.insert(http::header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_str(origin)?);
        Ok(self)
    }

    /// Format the response as raw HTTP/1.1 bytes, ready to write to a socket.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        self.headers.entry(http::header::CONTENT_LENGTH).or_insert_with(|| HeaderValue::from(self.body.len()));

        let mut out = Vec::with_capacity(128 + self.body.len());
        use std::io::Write;

        write!(out, "HTTP/1.1 {} {}\r\n", self.status.as_u16(), self.status.canonical_reason().unwrap_or(""))?;
        for (name, value) in &self.headers {
            write!(out, "{}: ", name)?;
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_response_has_content_type_and_length() {
        let bytes = Response::text("hi").into_bytes().unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("content-type: text/plain; charset=utf-8\r\n"));
        assert!(s.contains("content-length: 2\r\n"));
        assert!(s.ends_with("hi"));
    }

    #[test]
    fn json_response_serializes_body() {
        let res = Response::json(&serde_json::json!({"ok": true})).unwrap();
        let bytes = res.into_bytes().unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert!(s.contains("application/json"));
        assert!(s.ends_with("{\"ok\":true}"));
    }

    #[test]
    fn security_headers_do_not_override_explicit_ones() {
        let res = Response::with_status(StatusCode::OK)
            .header(HeaderName::from_static("x-frame-options"), HeaderValue::from_static("DENY"))
            .with_security_headers();

        assert_eq!(res.headers.get("x-frame-options").unwrap(), "DENY");
    }
}
