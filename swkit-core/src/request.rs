//! Fetch request model.
//!
//! A [`Request`] is what a page asks the network for and what a cache uses as
//! its key. Bodies are buffered into [`Bytes`], so cloning a request (for
//! example to keep the original around for `fetchDidFail` callbacks) only
//! bumps a reference count.
//!
//! ```
//! use swkit_core::{Request, RequestDestination, RequestMode};
//!
//! let request = Request::get("https://example.com/app.css?v=2")
//!     .unwrap()
//!     .with_destination(RequestDestination::Style);
//!
//! assert_eq!(request.url(), "https://example.com/app.css?v=2");
//! assert_eq!(request.url_without_search(), "https://example.com/app.css");
//! assert_eq!(request.mode(), RequestMode::Cors);
//! ```

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::uri::InvalidUri;
use http::{HeaderMap, Method, Uri};

/// Mode of a request, mirroring the Fetch standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestMode {
    /// A top-level navigation.
    Navigate,
    /// Same-origin only.
    SameOrigin,
    /// Cross-origin without CORS; yields opaque responses.
    NoCors,
    /// Cross-origin with CORS.
    #[default]
    Cors,
}

/// What kind of resource a request is for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RequestDestination {
    /// No particular destination (`fetch()` from script).
    #[default]
    Empty,
    /// A document (navigation or iframe).
    Document,
    /// An image.
    Image,
    /// A script.
    Script,
    /// A stylesheet.
    Style,
    /// A font.
    Font,
    /// Any other destination, by its Fetch-standard name.
    Other(String),
}

/// A request as seen by caches and fetchers.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    mode: RequestMode,
    destination: RequestDestination,
}

impl Request {
    /// Creates a request with an empty body and default mode.
    pub fn new(method: Method, uri: Uri) -> Self {
        Request {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            mode: RequestMode::default(),
            destination: RequestDestination::default(),
        }
    }

    /// Creates a `GET` request for `url`.
    pub fn get(url: &str) -> Result<Self, InvalidUri> {
        Ok(Request::new(Method::GET, url.parse()?))
    }

    /// Creates a `GET` navigation request for `url`.
    pub fn navigate(url: &str) -> Result<Self, InvalidUri> {
        Ok(Request::get(url)?
            .with_mode(RequestMode::Navigate)
            .with_destination(RequestDestination::Document))
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Full URL of the request.
    pub fn url(&self) -> String {
        self.uri.to_string()
    }

    /// URL of the request with the query string removed.
    pub fn url_without_search(&self) -> String {
        let mut url = String::new();
        if let Some(scheme) = self.uri.scheme_str() {
            url.push_str(scheme);
            url.push_str("://");
        }
        if let Some(authority) = self.uri.authority() {
            url.push_str(authority.as_str());
        }
        url.push_str(self.uri.path());
        url
    }

    /// Origin (`scheme://authority`) of the request, if the URI is absolute.
    pub fn origin(&self) -> Option<String> {
        let scheme = self.uri.scheme_str()?;
        let authority = self.uri.authority()?;
        Some(format!("{scheme}://{}", authority.as_str()))
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Buffered request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Request mode.
    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    /// Request destination.
    pub fn destination(&self) -> &RequestDestination {
        &self.destination
    }

    /// Returns a copy of this request pointing at another URI.
    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// Sets the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Appends a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the mode.
    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the destination.
    pub fn with_destination(mut self, destination: RequestDestination) -> Self {
        self.destination = destination;
        self
    }

    /// Converts the request into an [`http::Request`].
    pub fn into_http(self) -> http::Request<Bytes> {
        let mut request = http::Request::new(self.body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Request {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            mode: RequestMode::default(),
            destination: RequestDestination::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_without_search_drops_query() {
        let request = Request::get("https://example.com/a/b?x=1&y=2").unwrap();
        assert_eq!(request.url_without_search(), "https://example.com/a/b");
        assert_eq!(request.origin().as_deref(), Some("https://example.com"));
    }

    #[test]
    fn navigate_sets_mode_and_destination() {
        let request = Request::navigate("https://example.com/").unwrap();
        assert_eq!(request.mode(), RequestMode::Navigate);
        assert_eq!(request.destination(), &RequestDestination::Document);
        assert_eq!(request.method(), Method::GET);
    }

    #[test]
    fn relative_uri_has_no_origin() {
        let request = Request::get("/index.html").unwrap();
        assert_eq!(request.origin(), None);
        assert_eq!(request.url_without_search(), "/index.html");
    }
}
