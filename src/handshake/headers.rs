//! Conversion of `httparse` header arrays into `http::HeaderMap`.

use http::{HeaderMap, HeaderName, HeaderValue};
use httparse::Header;

use crate::error::Result;

/// Limit on the number of header lines accepted in a handshake request.
pub const MAX_HEADERS: usize = 124;

pub(crate) trait FromHttparse<T>: Sized {
    fn from_httparse(raw: T) -> Result<Self>;
}

impl<'b: 'h, 'h> FromHttparse<&'b [Header<'h>]> for HeaderMap {
    fn from_httparse(raw: &'b [Header<'h>]) -> Result<Self> {
        let mut headers = HeaderMap::new();

        for h in raw {
            headers.append(HeaderName::from_bytes(h.name.as_bytes())?, HeaderValue::from_bytes(h.value)?);
        }

        Ok(headers)
    }
}
