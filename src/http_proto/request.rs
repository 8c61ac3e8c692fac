//! HTTP/1.1 request parsing.

use std::collections::HashMap;

use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};
use httparse::{Status, EMPTY_HEADER};
use serde::de::DeserializeOwned;

use crate::error::{Error, ProtocolError, Result};

const MAX_HEADERS: usize = 64;

fn headers_from_httparse(raw: &[httparse::Header<'_>]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for h in raw {
        headers.append(HeaderName::from_bytes(h.name.as_bytes())?, HeaderValue::from_bytes(h.value)?);
    }
    Ok(headers)
}

/// A parsed HTTP/1.1 request, header section plus a fully-buffered body.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Request target (path + query).
    pub uri: Uri,
    /// HTTP version.
    pub version: Version,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body, already fully read.
    pub body: Vec<u8>,
    /// Path parameters captured from the matched route pattern (e.g. `{id}`).
    /// Empty until the router fills it in after matching.
    pub params: HashMap<String, String>,
}

impl Request {
    /// Try to parse a complete request (headers + body, per `Content-Length`)
    /// out of `buf`. Returns `None` if more data is needed.
    pub fn parse(buf: &[u8]) -> Result<Option<(usize, Self)>> {
        let mut header_buf = [EMPTY_HEADER; MAX_HEADERS];
        let mut raw = httparse::Request::new(&mut header_buf);

        let header_len = match raw.parse(buf) {
            Ok(Status::Complete(n)) => n,
            Ok(Status::Partial) => return Ok(None),
            Err(e) => return Err(Error::from(e)),
        };

        let method: Method =
            raw.method.ok_or(Error::Protocol(ProtocolError::MalformedRequest))?.parse().map_err(|_| {
                Error::Protocol(ProtocolError::MalformedRequest)
            })?;
        let uri: Uri = raw.path.ok_or(Error::Protocol(ProtocolError::MalformedRequest))?.parse()?;
        let version = if raw.version == Some(1) { Version::HTTP_11 } else { Version::HTTP_10 };
        let headers = headers_from_httparse(raw.headers)?;

        let content_length = headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);

        if buf.len() < header_len + content_length {
            return Ok(None);
        }

        let body = buf[header_len..header_len + content_length].to_vec();
        let consumed = header_len + content_length;

        Ok(Some((consumed, Request { method, uri, version, headers, body, params: HashMap::new() })))
    }

    /// Attach path parameters captured from the matched route pattern.
    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    /// Parse the query string into a multi-map.
    pub fn query(&self) -> HashMap<String, Vec<String>> {
        self.uri.query().map(super::query::parse).unwrap_or_default()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Fatal(format!("invalid JSON body: {e}")))
    }

    /// Parse the body as `application/x-www-form-urlencoded`.
    pub fn form(&self) -> HashMap<String, Vec<String>> {
        super::query::parse(&String::from_utf8_lossy(&self.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_get_request_with_query_string() {
        let buf = b"GET /users?tag=a&tag=b HTTP/1.1\r\nHost: x\r\n\r\n";
        let (consumed, req) = Request::parse(buf).unwrap().unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.query().get("tag"), Some(&vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn waits_for_the_full_body_per_content_length() {
        let buf = b"POST /x HTTP/1.1\r\nContent-Length: 5\r\n\r\nhel";
        assert!(Request::parse(buf).unwrap().is_none());
    }

    #[test]
    fn parses_json_body() {
        let buf = b"POST /x HTTP/1.1\r\nContent-Length: 13\r\n\r\n{\"a\":1,\"b\":2}";
        let (_, req) = Request::parse(buf).unwrap().unwrap();
        let value: serde_json::Value = req.json().unwrap();
        assert_eq!(value["a"], 1);
    }
}
