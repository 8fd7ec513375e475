//! Fetch response model.
//!
//! [`Response`] carries a fully buffered body. A browser `Response` body can
//! only be read once, which forces every consumer that needs the body twice
//! (return it *and* store it) to clone first. With a buffered [`Bytes`] body
//! the clone is a reference-count bump plus a header-map copy, and clones are
//! byte-identical by construction.
//!
//! Opaque responses (cross-origin `no-cors`) report status `0`, exactly like
//! the platform does, so cacheability rules can be expressed over plain `u16`
//! status codes.

use std::borrow::Cow;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{DATE, HeaderName, HeaderValue, VARY};
use http::{HeaderMap, StatusCode, Uri};

/// Type of a response, mirroring the Fetch standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseType {
    /// Same-origin response.
    #[default]
    Basic,
    /// Cross-origin response with CORS headers.
    Cors,
    /// Cross-origin `no-cors` response; status and headers are hidden.
    Opaque,
    /// Network error.
    Error,
}

/// A response produced by the network or retrieved from a cache.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    kind: ResponseType,
    url: Option<Uri>,
}

impl Response {
    /// Creates a basic response.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Response {
            status: status.as_u16(),
            headers: HeaderMap::new(),
            body: body.into(),
            kind: ResponseType::Basic,
            url: None,
        }
    }

    /// Creates a `200 OK` response.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Response::new(StatusCode::OK, body)
    }

    /// Creates an opaque response (status `0`, no headers, empty body).
    pub fn opaque() -> Self {
        Response {
            status: 0,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            kind: ResponseType::Opaque,
            url: None,
        }
    }

    /// Creates a network-error response.
    pub fn error() -> Self {
        Response {
            status: 0,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            kind: ResponseType::Error,
            url: None,
        }
    }

    /// Numeric status; `0` for opaque and error responses.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// `true` for statuses in the `200..=299` range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response type.
    pub fn kind(&self) -> ResponseType {
        self.kind
    }

    /// Final URL of the response, when known.
    pub fn url(&self) -> Option<&Uri> {
        self.url.as_ref()
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Buffered body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Consumes the response and returns its body.
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Parsed `Date` header.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        let value = self.header(DATE.as_str())?;
        DateTime::parse_from_rfc2822(value)
            .ok()
            .map(|date| date.with_timezone(&Utc))
    }

    /// Header names listed in `Vary`, lower-cased. `*` is returned as-is.
    pub fn vary(&self) -> Vec<String> {
        self.headers
            .get_all(VARY)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(|name| name.trim().to_ascii_lowercase())
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// Appends a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the response type.
    pub fn with_kind(mut self, kind: ResponseType) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the final URL.
    pub fn with_url(mut self, url: Uri) -> Self {
        self.url = Some(url);
        self
    }
}

impl From<http::Response<Bytes>> for Response {
    fn from(response: http::Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Response {
            status: parts.status.as_u16(),
            headers: parts.headers,
            body,
            kind: ResponseType::Basic,
            url: None,
        }
    }
}
