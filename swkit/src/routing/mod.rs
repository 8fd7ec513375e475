//! Matching fetch events to handlers.
//!
//! A [`Router`] holds [`Route`]s grouped by HTTP method. The first route whose
//! [`Matcher`] accepts the request URL wins and its [`RouteHandler`] produces
//! the response. [`Strategy`](crate::strategy::Strategy) implements
//! `RouteHandler`, and any async function can be turned into one with
//! [`handler_fn`].

mod route;
mod router;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use smol_str::SmolStr;
use swkit_core::{FetchEvent, Request, Response};

pub use route::{MatchContext, Matcher, Route};
pub use router::Router;

use crate::error::StrategyError;

/// Values captured by a matching route (for example regex capture groups).
pub type RouteParams = Vec<SmolStr>;

/// Everything a handler gets for one request.
#[derive(Debug, Clone)]
pub struct HandlerOptions {
    /// The request to answer. Usually the event's request.
    pub request: Request,
    /// The event the request came from.
    pub event: FetchEvent,
    /// Parameters captured by the matching route.
    pub params: Option<RouteParams>,
    /// For catch handlers, the failure of the handler they stand in for.
    pub error: Option<StrategyError>,
}

impl HandlerOptions {
    /// Options for `request`, carried by `event`.
    pub fn new(request: Request, event: FetchEvent) -> Self {
        HandlerOptions {
            request,
            event,
            params: None,
            error: None,
        }
    }

    /// Sets the route parameters.
    pub fn with_params(mut self, params: Option<RouteParams>) -> Self {
        self.params = params;
        self
    }

    /// Sets the error a catch handler is invoked for.
    pub fn with_error(mut self, error: StrategyError) -> Self {
        self.error = Some(error);
        self
    }
}

impl From<FetchEvent> for HandlerOptions {
    fn from(event: FetchEvent) -> Self {
        HandlerOptions::new(event.request().clone(), event)
    }
}

impl From<&FetchEvent> for HandlerOptions {
    fn from(event: &FetchEvent) -> Self {
        HandlerOptions::from(event.clone())
    }
}

/// Produces a response for a routed request.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    /// Answers the request described by `options`.
    async fn handle(&self, options: HandlerOptions) -> Result<Response, StrategyError>;
}

#[async_trait]
impl<T> RouteHandler for Arc<T>
where
    T: RouteHandler + ?Sized,
{
    async fn handle(&self, options: HandlerOptions) -> Result<Response, StrategyError> {
        (**self).handle(options).await
    }
}

/// A [`RouteHandler`] backed by an async function.
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Wraps an async function as a [`RouteHandler`].
///
/// ```
/// use swkit::routing::handler_fn;
/// use swkit_core::Response;
///
/// let offline = handler_fn(|_options| async { Ok(Response::ok("offline")) });
/// # let _ = offline;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(HandlerOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, StrategyError>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> RouteHandler for FnHandler<F>
where
    F: Fn(HandlerOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, StrategyError>> + Send + 'static,
{
    async fn handle(&self, options: HandlerOptions) -> Result<Response, StrategyError> {
        (self.f)(options).await
    }
}
