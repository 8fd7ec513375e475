use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use swkit_core::{FetchEvent, Response};
use tracing::{debug, warn};

use super::{HandlerOptions, MatchContext, Route, RouteHandler, RouteParams};
use crate::error::StrategyError;

/// Dispatches fetch events to routes.
#[derive(Default)]
pub struct Router {
    origin: Option<String>,
    routes: HashMap<Method, Vec<Route>>,
    default_handlers: HashMap<Method, Arc<dyn RouteHandler>>,
    catch_handler: Option<Arc<dyn RouteHandler>>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("origin", &self.origin)
            .field("routes", &self.routes)
            .field("default_methods", &self.default_handlers.keys().collect::<Vec<_>>())
            .field("has_catch_handler", &self.catch_handler.is_some())
            .finish()
    }
}

impl Router {
    /// A router for a worker served from `origin` (`scheme://host[:port]`).
    pub fn new(origin: impl Into<String>) -> Self {
        Router {
            origin: Some(origin.into()),
            ..Default::default()
        }
    }

    /// Origin of the worker, if known.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Adds `route`. Routes of the same method are tried in registration order.
    pub fn register_route(&mut self, route: Route) -> &mut Self {
        self.routes
            .entry(route.method().clone())
            .or_default()
            .push(route);
        self
    }

    /// Routes registered for `method`.
    pub fn routes(&self, method: &Method) -> &[Route] {
        self.routes.get(method).map(Vec::as_slice).unwrap_or_default()
    }

    /// Handler for `method` requests that match no route.
    pub fn set_default_handler(
        &mut self,
        handler: impl RouteHandler + 'static,
        method: Method,
    ) -> &mut Self {
        self.default_handlers.insert(method, Arc::new(handler));
        self
    }

    /// Handler used when a route's handler (and its own catch handler) fails.
    pub fn set_catch_handler(&mut self, handler: impl RouteHandler + 'static) -> &mut Self {
        self.catch_handler = Some(Arc::new(handler));
        self
    }

    fn is_same_origin(&self, origin: Option<&str>) -> bool {
        match (&self.origin, origin) {
            (Some(own), Some(origin)) => own == origin,
            (None, _) => true,
            (Some(_), None) => true,
        }
    }

    /// First route matching the event's request, with its params.
    pub fn find_matching_route(&self, event: &FetchEvent) -> Option<(&Route, Option<RouteParams>)> {
        let request = event.request();
        let origin = request.origin();
        let context = MatchContext {
            url: request.uri(),
            same_origin: self.is_same_origin(origin.as_deref()),
            request,
            event,
        };

        self.routes(request.method()).iter().find_map(|route| {
            let params = route.matcher().matches(&context)?;
            let params = (!params.is_empty()).then_some(params);
            Some((route, params))
        })
    }

    /// Handles `event`.
    ///
    /// Returns `None` when the router does not handle the request: the URL
    /// is not http(s), or no route matches and there is no default handler
    /// for the method.
    pub async fn handle_request(
        &self,
        event: &FetchEvent,
    ) -> Option<Result<Response, StrategyError>> {
        let request = event.request();
        if !matches!(request.uri().scheme_str(), Some("http") | Some("https")) {
            debug!(url = %request.url(), "ignoring request with a non-http scheme");
            return None;
        }

        let (handler, params, route_catch) = match self.find_matching_route(event) {
            Some((route, params)) => {
                debug!(url = %request.url(), ?params, "found a matching route");
                (route.handler().clone(), params, route.catch_handler().cloned())
            }
            None => {
                let handler = self.default_handlers.get(request.method())?;
                debug!(url = %request.url(), "no route matched, using the default handler");
                (handler.clone(), None, None)
            }
        };

        let options = HandlerOptions::new(request.clone(), event.clone()).with_params(params);
        let mut error = match handler.handle(options.clone()).await {
            Ok(response) => return Some(Ok(response)),
            Err(error) => error,
        };

        if let Some(catch_handler) = route_catch {
            debug!(
                url = %request.url(),
                %error,
                "route handler failed, using the route catch handler"
            );
            match catch_handler.handle(options.clone().with_error(error.clone())).await {
                Ok(response) => return Some(Ok(response)),
                Err(catch_error) => error = catch_error,
            }
        }

        if let Some(catch_handler) = &self.catch_handler {
            debug!(url = %request.url(), %error, "using the global catch handler");
            let options = HandlerOptions::new(request.clone(), event.clone()).with_error(error);
            return Some(catch_handler.handle(options).await);
        }

        Some(Err(error))
    }

    /// Handles `event`, turning an unrecovered failure into a network-error response.
    pub async fn respond(&self, event: &FetchEvent) -> Option<Response> {
        match self.handle_request(event).await? {
            Ok(response) => Some(response),
            Err(error) => {
                warn!(url = %event.request().url(), %error, "responding with a network error");
                Some(Response::error())
            }
        }
    }
}
