//! [`Fetch`] implementation over reqwest-middleware clients.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware};
use swkit_core::{
    Fetch, FetchError, FetchOptions, FetchResult, Redirect, Request, RequestMode, Response,
    ResponseType,
};
use tracing::{debug, warn};

use crate::convert::{from_reqwest, to_reqwest};

/// Fetcher that sends requests with reqwest.
///
/// Two clients are kept: one following redirects, and one that never does,
/// used for [`Redirect::Error`] and [`Redirect::Manual`]. Middleware added
/// through the builder is installed on both.
///
/// # Examples
///
/// ```no_run
/// use swkit_core::{Fetch, Request};
/// use swkit_reqwest::ReqwestFetcher;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = ReqwestFetcher::new()?;
/// let response = fetcher.fetch(Request::get("https://example.com/")?, None).await?;
/// println!("{}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ReqwestFetcher {
    follow: ClientWithMiddleware,
    no_follow: ClientWithMiddleware,
    origin: Option<String>,
}

impl std::fmt::Debug for ReqwestFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestFetcher")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl ReqwestFetcher {
    /// Creates a fetcher with default clients and no middleware.
    pub fn new() -> reqwest::Result<Self> {
        Self::builder().build()
    }

    /// Creates a builder.
    pub fn builder() -> ReqwestFetcherBuilder {
        ReqwestFetcherBuilder::default()
    }

    /// Origin requests are compared against to decide the response type.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    fn response_type(&self, request: &Request) -> ResponseType {
        let cross_origin = match (&self.origin, request.origin()) {
            (Some(origin), Some(target)) => *origin != target,
            _ => false,
        };
        match (cross_origin, request.mode()) {
            (false, _) => ResponseType::Basic,
            (true, RequestMode::NoCors) => ResponseType::Opaque,
            (true, _) => ResponseType::Cors,
        }
    }
}

#[async_trait]
impl Fetch for ReqwestFetcher {
    async fn fetch(&self, request: Request, options: Option<&FetchOptions>) -> FetchResult {
        let url = request.url();
        let kind = self.response_type(&request);
        let redirect = options.map(|options| options.redirect).unwrap_or_default();
        let client = match redirect {
            Redirect::Follow => &self.follow,
            Redirect::Error | Redirect::Manual => &self.no_follow,
        };

        let started = Instant::now();
        let response = client
            .execute(to_reqwest(request, options)?)
            .await
            .map_err(|error| {
                warn!(url = %url, %error, "fetch failed");
                FetchError::network(error)
            })?;
        debug!(
            url = %url,
            status = response.status().as_u16(),
            elapsed = ?started.elapsed(),
            "fetched"
        );

        if redirect == Redirect::Error && response.status().is_redirection() {
            return Err(FetchError::network(format!(
                "redirect from '{url}' is not allowed"
            )));
        }

        match kind {
            ResponseType::Opaque => Ok(Response::opaque()),
            kind => Ok(from_reqwest(response).await?.with_kind(kind)),
        }
    }
}

/// Builder for [`ReqwestFetcher`].
#[derive(Default)]
pub struct ReqwestFetcherBuilder {
    client: Option<Client>,
    no_redirect_client: Option<Client>,
    middleware: Vec<Arc<dyn Middleware>>,
    origin: Option<String>,
}

impl ReqwestFetcherBuilder {
    /// Client used for requests that follow redirects.
    ///
    /// Defaults to a client built with reqwest's defaults.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Client used for requests that must not follow redirects.
    ///
    /// It should be built with [`Policy::none`]. Defaults to such a client.
    pub fn no_redirect_client(mut self, client: Client) -> Self {
        self.no_redirect_client = Some(client);
        self
    }

    /// Appends a middleware to both clients.
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Origin of the worker. Cross-origin `no-cors` requests then yield
    /// opaque responses and cross-origin `cors` requests yield `cors` ones.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Builds the fetcher, creating any client that was not supplied.
    pub fn build(self) -> reqwest::Result<ReqwestFetcher> {
        let follow = match self.client {
            Some(client) => client,
            None => Client::builder().build()?,
        };
        let no_follow = match self.no_redirect_client {
            Some(client) => client,
            None => Client::builder().redirect(Policy::none()).build()?,
        };

        let wrap = |client: Client| {
            self.middleware
                .iter()
                .fold(ClientBuilder::new(client), |builder, middleware| {
                    builder.with_arc(middleware.clone())
                })
                .build()
        };

        Ok(ReqwestFetcher {
            follow: wrap(follow),
            no_follow: wrap(no_follow),
            origin: self.origin,
        })
    }
}
