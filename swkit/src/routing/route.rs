use std::fmt;
use std::sync::Arc;

use http::{Method, Uri};
use regex::Regex;
use smol_str::SmolStr;
use swkit_core::{FetchEvent, Request};

use super::{RouteHandler, RouteParams};
use crate::error::RouteError;

/// What a matcher sees.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    /// URL of the request.
    pub url: &'a Uri,
    /// Whether the URL has the router's origin.
    pub same_origin: bool,
    /// The request.
    pub request: &'a Request,
    /// The event being routed.
    pub event: &'a FetchEvent,
}

type MatchCallback = Arc<dyn Fn(&MatchContext<'_>) -> Option<RouteParams> + Send + Sync>;

/// Decides whether a route handles a request.
#[derive(Clone)]
pub enum Matcher {
    /// Arbitrary predicate. `Some(params)` is a match.
    Callback(MatchCallback),
    /// Regular expression over the full URL. Capture groups become params.
    ///
    /// A match on a cross-origin URL only counts when it starts at the
    /// beginning of the URL.
    Regex(Regex),
}

impl Matcher {
    /// Matches when `predicate` returns `true`, without params.
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&MatchContext<'_>) -> bool + Send + Sync + 'static,
    {
        Matcher::Callback(Arc::new(move |context| {
            predicate(context).then(RouteParams::new)
        }))
    }

    /// Matches with the params returned by `callback`.
    pub fn callback<F>(callback: F) -> Self
    where
        F: Fn(&MatchContext<'_>) -> Option<RouteParams> + Send + Sync + 'static,
    {
        Matcher::Callback(Arc::new(callback))
    }

    /// Compiles `pattern` into a regex matcher.
    pub fn regex(pattern: &str) -> Result<Self, RouteError> {
        Regex::new(pattern)
            .map(Matcher::Regex)
            .map_err(|source| RouteError::InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            })
    }

    /// Matches same-origin requests whose path equals `path`.
    pub fn path(path: impl Into<String>) -> Self {
        let path = path.into();
        Matcher::when(move |context| context.same_origin && context.url.path() == path)
    }

    /// Matches requests with the given destination.
    pub fn destination(destination: swkit_core::RequestDestination) -> Self {
        Matcher::when(move |context| *context.request.destination() == destination)
    }

    /// Matches navigation requests.
    pub fn navigation() -> Self {
        Matcher::when(|context| context.request.mode() == swkit_core::RequestMode::Navigate)
    }

    /// Runs the matcher. `None` means no match.
    pub fn matches(&self, context: &MatchContext<'_>) -> Option<RouteParams> {
        match self {
            Matcher::Callback(callback) => callback(context),
            Matcher::Regex(regex) => {
                let url = context.url.to_string();
                let captures = regex.captures(&url)?;
                let whole = captures.get(0)?;
                if !context.same_origin && whole.start() != 0 {
                    return None;
                }
                Some(
                    captures
                        .iter()
                        .skip(1)
                        .map(|group| {
                            group
                                .map(|group| SmolStr::new(group.as_str()))
                                .unwrap_or_default()
                        })
                        .collect(),
                )
            }
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Callback(_) => f.write_str("Matcher::Callback"),
            Matcher::Regex(regex) => f
                .debug_tuple("Matcher::Regex")
                .field(&regex.as_str())
                .finish(),
        }
    }
}

/// A matcher, a handler and the method they apply to.
#[derive(Clone)]
pub struct Route {
    matcher: Matcher,
    handler: Arc<dyn RouteHandler>,
    method: Method,
    catch_handler: Option<Arc<dyn RouteHandler>>,
}

impl Route {
    /// A `GET` route.
    pub fn new(matcher: Matcher, handler: impl RouteHandler + 'static) -> Self {
        Route {
            matcher,
            handler: Arc::new(handler),
            method: Method::GET,
            catch_handler: None,
        }
    }

    /// Sets the method the route applies to.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets a handler used when this route's handler fails.
    pub fn with_catch_handler(mut self, handler: impl RouteHandler + 'static) -> Self {
        self.catch_handler = Some(Arc::new(handler));
        self
    }

    /// The route's matcher.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// The route's handler.
    pub fn handler(&self) -> &Arc<dyn RouteHandler> {
        &self.handler
    }

    /// The method the route applies to.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The route's catch handler.
    pub fn catch_handler(&self) -> Option<&Arc<dyn RouteHandler>> {
        self.catch_handler.as_ref()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("matcher", &self.matcher)
            .field("method", &self.method)
            .field("has_catch_handler", &self.catch_handler.is_some())
            .finish()
    }
}
