//! Network access.
//!
//! [`Fetch`] is the seam between the engine and the transport. The engine
//! never talks to a socket itself; it hands a [`Request`] and optional
//! [`FetchOptions`] to whatever fetcher the platform was built with.

use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::{FetchError, Request, Response};

/// Result type of fetch operations.
pub type FetchResult = Result<Response, FetchError>;

/// Whether credentials are sent with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    /// Never send credentials.
    Omit,
    /// Send credentials to the same origin only.
    #[default]
    SameOrigin,
    /// Always send credentials.
    Include,
}

/// How redirects are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Redirect {
    /// Follow redirects transparently.
    #[default]
    Follow,
    /// Treat a redirect as a network error.
    Error,
    /// Return the redirect response itself.
    Manual,
}

/// How the transport's own HTTP cache is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    /// Regular HTTP caching rules.
    #[default]
    Default,
    /// Bypass the HTTP cache entirely.
    NoStore,
    /// Always revalidate with the server.
    NoCache,
    /// Bypass the HTTP cache and refresh it with the result.
    Reload,
}

/// Extra options passed through to the fetcher.
///
/// They are never applied to navigation requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
    /// Headers added to the outgoing request.
    #[serde(skip)]
    pub headers: HeaderMap,
    /// Credential policy.
    #[serde(default)]
    pub credentials: Credentials,
    /// Redirect policy.
    #[serde(default)]
    pub redirect: Redirect,
    /// HTTP cache policy.
    #[serde(default)]
    pub cache: CacheMode,
}

impl FetchOptions {
    /// Adds a header to every fetched request.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the credential policy.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the redirect policy.
    pub fn redirect(mut self, redirect: Redirect) -> Self {
        self.redirect = redirect;
        self
    }

    /// Sets the HTTP cache policy.
    pub fn cache(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }
}

/// Performs network requests.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Sends `request`, applying `options` when given.
    ///
    /// An HTTP error status is still `Ok`; only transport failures are errors.
    async fn fetch(&self, request: Request, options: Option<&FetchOptions>) -> FetchResult;
}

#[async_trait]
impl<T> Fetch for Arc<T>
where
    T: Fetch + ?Sized,
{
    async fn fetch(&self, request: Request, options: Option<&FetchOptions>) -> FetchResult {
        (**self).fetch(request, options).await
    }
}
