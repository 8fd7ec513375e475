//! Caching strategies.
//!
//! A [`Strategy`] is configuration plus a [`StrategyKind`] naming the policy
//! that combines cache lookups and network fetches:
//!
//! | Kind | Policy |
//! |------|--------|
//! | `CacheOnly` | cache, else no-response |
//! | `CacheFirst` | cache, else network (and cache it), else no-response |
//! | `NetworkOnly` | network (optionally timed out), else no-response |
//! | `NetworkFirst` | network (and cache it) raced against an optional timer, else cache |
//! | `StaleWhileRevalidate` | cache while the network refreshes it, else network |
//!
//! Every request gets its own [`StrategyHandler`], which performs the cache
//! and network operations through the strategy's plugins and tracks work that
//! must finish after the response is returned.
//!
//! [`Strategy::handle_all`] must be called from within a tokio runtime: the
//! handling runs on a spawned task so that it keeps going after the caller has
//! received its response.

mod cache_first;
mod cache_only;
mod handler;
mod network_first;
mod network_only;
mod stale_while_revalidate;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use pin_project::pin_project;
use smol_str::SmolStr;
use swkit_core::{CacheQueryOptions, FetchOptions, Request, Response, ResponseType};
use tokio::sync::oneshot;
use tracing::{Instrument, debug, info_span};

pub use handler::StrategyHandler;

use crate::cache_names;
use crate::error::StrategyError;
use crate::platform::Platform;
use crate::plugin::{LifecyclePoint, Plugin};
use crate::plugins::cache_ok_and_opaque;
use crate::routing::{HandlerOptions, RouteHandler};

/// The policy a strategy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Serve from the cache, falling back to the network.
    CacheFirst,
    /// Serve from the cache only.
    CacheOnly,
    /// Serve from the network, falling back to the cache.
    NetworkFirst {
        /// Fall back to the cache when the network takes longer than this.
        network_timeout: Option<Duration>,
    },
    /// Serve from the network only.
    NetworkOnly {
        /// Fail when the network takes longer than this.
        network_timeout: Option<Duration>,
    },
    /// Serve from the cache and refresh it from the network.
    StaleWhileRevalidate,
}

impl StrategyKind {
    /// Name used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::CacheFirst => "CacheFirst",
            StrategyKind::CacheOnly => "CacheOnly",
            StrategyKind::NetworkFirst { .. } => "NetworkFirst",
            StrategyKind::NetworkOnly { .. } => "NetworkOnly",
            StrategyKind::StaleWhileRevalidate => "StaleWhileRevalidate",
        }
    }

    /// The configured network timeout, for the kinds that have one.
    pub fn network_timeout(&self) -> Option<Duration> {
        match self {
            StrategyKind::NetworkFirst { network_timeout }
            | StrategyKind::NetworkOnly { network_timeout } => *network_timeout,
            _ => None,
        }
    }

    fn caches_opaque_by_default(&self) -> bool {
        matches!(
            self,
            StrategyKind::NetworkFirst { .. } | StrategyKind::StaleWhileRevalidate
        )
    }
}

#[derive(Debug, Clone)]
struct StrategyInner {
    kind: StrategyKind,
    cache_name: SmolStr,
    plugins: Vec<Plugin>,
    fetch_options: Option<FetchOptions>,
    match_options: Option<CacheQueryOptions>,
    platform: Platform,
}

/// A configured caching strategy.
///
/// Cheap to clone; clones share configuration until one of them is modified
/// with [`Strategy::add_plugins`].
#[derive(Debug, Clone)]
pub struct Strategy {
    inner: Arc<StrategyInner>,
}

impl Strategy {
    /// Starts building a strategy of `kind` running against `platform`.
    pub fn builder(kind: StrategyKind, platform: Platform) -> StrategyBuilder {
        StrategyBuilder {
            kind,
            platform,
            cache_name: None,
            plugins: Vec::new(),
            fetch_options: None,
            match_options: None,
        }
    }

    /// Starts building a cache-first strategy.
    pub fn cache_first(platform: Platform) -> StrategyBuilder {
        Strategy::builder(StrategyKind::CacheFirst, platform)
    }

    /// Starts building a cache-only strategy.
    pub fn cache_only(platform: Platform) -> StrategyBuilder {
        Strategy::builder(StrategyKind::CacheOnly, platform)
    }

    /// Starts building a network-first strategy.
    pub fn network_first(platform: Platform) -> StrategyBuilder {
        Strategy::builder(
            StrategyKind::NetworkFirst {
                network_timeout: None,
            },
            platform,
        )
    }

    /// Starts building a network-only strategy.
    pub fn network_only(platform: Platform) -> StrategyBuilder {
        Strategy::builder(
            StrategyKind::NetworkOnly {
                network_timeout: None,
            },
            platform,
        )
    }

    /// Starts building a stale-while-revalidate strategy.
    pub fn stale_while_revalidate(platform: Platform) -> StrategyBuilder {
        Strategy::builder(StrategyKind::StaleWhileRevalidate, platform)
    }

    /// The policy.
    pub fn kind(&self) -> StrategyKind {
        self.inner.kind
    }

    /// Cache read from and written to.
    pub fn cache_name(&self) -> &SmolStr {
        &self.inner.cache_name
    }

    /// Plugins, in invocation order.
    pub fn plugins(&self) -> &[Plugin] {
        &self.inner.plugins
    }

    /// Options passed to the fetcher for non-navigation requests.
    pub fn fetch_options(&self) -> Option<&FetchOptions> {
        self.inner.fetch_options.as_ref()
    }

    /// Options used for cache lookups.
    pub fn match_options(&self) -> Option<CacheQueryOptions> {
        self.inner.match_options
    }

    /// Storage and fetcher.
    pub fn platform(&self) -> &Platform {
        &self.inner.platform
    }

    /// Appends plugins.
    pub fn add_plugins<I>(&mut self, plugins: I)
    where
        I: IntoIterator,
        I::Item: Into<Plugin>,
    {
        Arc::make_mut(&mut self.inner)
            .plugins
            .extend(plugins.into_iter().map(Into::into));
    }

    /// Starts handling a request.
    ///
    /// Returns the response future and a future that resolves once the
    /// handler and all its extended-lifetime work have completed. The latter
    /// is also registered with the event, so dropping it does not cut the
    /// work short.
    pub fn handle_all(&self, options: impl Into<HandlerOptions>) -> (ResponseFuture, DoneFuture) {
        let options = options.into();
        let event = options.event.clone();
        let url = options.request.url();
        let span = info_span!("strategy", strategy = self.kind().name(), url = %url);

        let handler = StrategyHandler::new(self.clone(), options);
        let strategy = self.clone();
        let (sender, receiver) = oneshot::channel();

        let task = tokio::spawn(
            async move {
                let started = Instant::now();
                let response = strategy.get_response(&handler).await;
                let outcome = if response.is_ok() { "response" } else { "error" };
                crate::metrics::record_handler_duration(
                    strategy.kind().name(),
                    outcome,
                    started.elapsed(),
                );
                let _ = sender.send(response.clone());
                strategy.await_complete(&handler, response).await
            }
            .instrument(span),
        );

        let done = task
            .map(|joined| joined.unwrap_or_else(|error| Err(error.into())))
            .boxed()
            .shared();
        event.wait_until(done.clone());

        (
            ResponseFuture {
                receiver,
                url: url.clone(),
            },
            DoneFuture { inner: done, url },
        )
    }

    /// Handles a request and returns the response.
    pub async fn handle(
        &self,
        options: impl Into<HandlerOptions>,
    ) -> Result<Response, StrategyError> {
        let (response, _done) = self.handle_all(options);
        response.await
    }

    async fn run(
        &self,
        handler: &StrategyHandler,
        request: Request,
    ) -> Result<Response, StrategyError> {
        match self.kind() {
            StrategyKind::CacheFirst => cache_first::handle(handler, request).await,
            StrategyKind::CacheOnly => cache_only::handle(handler, request).await,
            StrategyKind::NetworkFirst { network_timeout } => {
                network_first::handle(handler, request, network_timeout).await
            }
            StrategyKind::NetworkOnly { network_timeout } => {
                network_only::handle(handler, request, network_timeout).await
            }
            StrategyKind::StaleWhileRevalidate => {
                stale_while_revalidate::handle(handler, request).await
            }
        }
    }

    async fn get_response(&self, handler: &StrategyHandler) -> Result<Response, StrategyError> {
        let request = handler.request().clone();
        let pipeline = handler.pipeline();

        let outcome = async {
            pipeline.handler_will_start(&request).await?;
            let response = self.run(handler, request.clone()).await?;
            if response.kind() == ResponseType::Error {
                return Err(StrategyError::no_response(request.url(), None));
            }
            Ok(response)
        }
        .await;

        let response = match outcome {
            Ok(response) => response,
            Err(error) => {
                if !pipeline.has(LifecyclePoint::HandlerDidError) {
                    return Err(error);
                }
                debug!(%error, "handling failed, asking plugins for a fallback");
                match pipeline.handler_did_error(&request, &error).await? {
                    Some(fallback) => fallback,
                    None => return Err(error),
                }
            }
        };

        pipeline.handler_will_respond(&request, response).await
    }

    async fn await_complete(
        &self,
        handler: &StrategyHandler,
        response: Result<Response, StrategyError>,
    ) -> Result<(), StrategyError> {
        let request = handler.request();
        let pipeline = handler.pipeline();
        let response = response.ok();

        let mut error = pipeline
            .handler_did_respond(request, response.as_ref())
            .await
            .err();
        if error.is_none() {
            error = handler.done_waiting().await.err();
        }

        pipeline
            .handler_did_complete(request, response.as_ref(), error.as_ref())
            .await?;

        error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl RouteHandler for Strategy {
    async fn handle(&self, options: HandlerOptions) -> Result<Response, StrategyError> {
        Strategy::handle(self, options).await
    }
}

/// Builder for [`Strategy`].
#[derive(Debug)]
pub struct StrategyBuilder {
    kind: StrategyKind,
    platform: Platform,
    cache_name: Option<SmolStr>,
    plugins: Vec<Plugin>,
    fetch_options: Option<FetchOptions>,
    match_options: Option<CacheQueryOptions>,
}

impl StrategyBuilder {
    /// Cache to use. Defaults to the runtime cache name.
    pub fn cache_name(mut self, cache_name: impl Into<SmolStr>) -> Self {
        self.cache_name = Some(cache_name.into());
        self
    }

    /// Appends a plugin.
    pub fn plugin(mut self, plugin: impl Into<Plugin>) -> Self {
        self.plugins.push(plugin.into());
        self
    }

    /// Appends plugins.
    pub fn plugins<I>(mut self, plugins: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Plugin>,
    {
        self.plugins.extend(plugins.into_iter().map(Into::into));
        self
    }

    /// Options passed to the fetcher.
    pub fn fetch_options(mut self, fetch_options: FetchOptions) -> Self {
        self.fetch_options = Some(fetch_options);
        self
    }

    /// Options used for cache lookups.
    pub fn match_options(mut self, match_options: CacheQueryOptions) -> Self {
        self.match_options = Some(match_options);
        self
    }

    /// Network timeout of `NetworkFirst` and `NetworkOnly`. A zero duration
    /// disables the timeout; other kinds ignore it.
    pub fn network_timeout(mut self, timeout: Duration) -> Self {
        let timeout = (!timeout.is_zero()).then_some(timeout);
        match &mut self.kind {
            StrategyKind::NetworkFirst { network_timeout }
            | StrategyKind::NetworkOnly { network_timeout } => *network_timeout = timeout,
            kind => debug!(strategy = kind.name(), "network timeout ignored"),
        }
        self
    }

    /// Builds the strategy.
    ///
    /// `NetworkFirst` and `StaleWhileRevalidate` without any `cacheWillUpdate`
    /// plugin get one that accepts status 200 and opaque responses.
    pub fn build(self) -> Strategy {
        let mut plugins = self.plugins;
        let has_cache_will_update = plugins
            .iter()
            .any(|plugin| plugin.has(LifecyclePoint::CacheWillUpdate));
        if self.kind.caches_opaque_by_default() && !has_cache_will_update {
            plugins.insert(0, cache_ok_and_opaque());
        }

        Strategy {
            inner: Arc::new(StrategyInner {
                kind: self.kind,
                cache_name: cache_names::runtime_name(self.cache_name.as_deref()),
                plugins,
                fetch_options: self.fetch_options,
                match_options: self.match_options,
                platform: self.platform,
            }),
        }
    }
}

impl From<StrategyBuilder> for Strategy {
    fn from(builder: StrategyBuilder) -> Self {
        builder.build()
    }
}

/// Resolves to the response of a request started with [`Strategy::handle_all`].
#[pin_project]
#[derive(Debug)]
pub struct ResponseFuture {
    #[pin]
    receiver: oneshot::Receiver<Result<Response, StrategyError>>,
    url: String,
}

impl Future for ResponseFuture {
    type Output = Result<Response, StrategyError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match ready!(this.receiver.poll(cx)) {
            Ok(result) => Poll::Ready(result),
            Err(_) => Poll::Ready(Err(StrategyError::Task(SmolStr::new(format!(
                "handler for '{}' stopped before responding",
                this.url
            ))))),
        }
    }
}

type SharedDone = Shared<BoxFuture<'static, Result<(), StrategyError>>>;

/// Resolves once a handler and all its extended-lifetime work have completed.
#[pin_project]
pub struct DoneFuture {
    #[pin]
    inner: SharedDone,
    url: String,
}

impl Future for DoneFuture {
    type Output = Result<(), StrategyError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.project().inner.poll(cx)
    }
}

impl fmt::Debug for DoneFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoneFuture").field("url", &self.url).finish()
    }
}
