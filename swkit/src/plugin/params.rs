use smol_str::SmolStr;
use swkit_core::{CacheQueryOptions, FetchEvent, Request, Response};

use crate::error::StrategyError;
use crate::routing::RouteParams;

use super::PluginState;

/// Whether a cache key is computed for a lookup or for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKeyMode {
    /// The key is used to read from the cache.
    Read,
    /// The key is used to write into the cache.
    Write,
}

/// Parameters of `cacheKeyWillBeUsed`.
#[derive(Debug, Clone)]
pub struct CacheKeyWillBeUsedParams {
    /// Key produced so far.
    pub request: Request,
    /// Read or write.
    pub mode: CacheKeyMode,
    /// Parameters captured by the matching route.
    pub params: Option<RouteParams>,
    /// The event being handled.
    pub event: FetchEvent,
    /// This plugin's state for the request.
    pub state: PluginState,
}

/// Parameters of `cacheWillUpdate`.
#[derive(Debug, Clone)]
pub struct CacheWillUpdateParams {
    /// The cache key.
    pub request: Request,
    /// The response about to be written.
    pub response: Response,
    /// The event being handled.
    pub event: FetchEvent,
    /// This plugin's state for the request.
    pub state: PluginState,
}

/// Parameters of `cachedResponseWillBeUsed`.
#[derive(Debug, Clone)]
pub struct CachedResponseWillBeUsedParams {
    /// Cache the response came from.
    pub cache_name: SmolStr,
    /// The cache key.
    pub request: Request,
    /// Response produced so far. `None` on a miss or after an earlier plugin rejected it.
    pub cached_response: Option<Response>,
    /// Options the lookup was made with.
    pub match_options: Option<CacheQueryOptions>,
    /// The event being handled.
    pub event: FetchEvent,
    /// This plugin's state for the request.
    pub state: PluginState,
}

/// Parameters of `cacheDidUpdate`.
#[derive(Debug, Clone)]
pub struct CacheDidUpdateParams {
    /// Cache that was written.
    pub cache_name: SmolStr,
    /// The cache key.
    pub request: Request,
    /// Entry that was replaced, if any.
    pub old_response: Option<Response>,
    /// Entry that was written.
    pub new_response: Response,
    /// The event being handled.
    pub event: FetchEvent,
    /// This plugin's state for the request.
    pub state: PluginState,
}

/// Parameters of `requestWillFetch`.
#[derive(Debug, Clone)]
pub struct RequestWillFetchParams {
    /// Request produced so far.
    pub request: Request,
    /// The event being handled.
    pub event: FetchEvent,
    /// This plugin's state for the request.
    pub state: PluginState,
}

/// Parameters of `fetchDidSucceed`.
#[derive(Debug, Clone)]
pub struct FetchDidSucceedParams {
    /// Request that was sent.
    pub request: Request,
    /// Response produced so far.
    pub response: Response,
    /// The event being handled.
    pub event: FetchEvent,
    /// This plugin's state for the request.
    pub state: PluginState,
}

/// Parameters of `fetchDidFail`.
#[derive(Debug, Clone)]
pub struct FetchDidFailParams {
    /// Request as given to the handler, before `requestWillFetch`.
    pub original_request: Request,
    /// Request after `requestWillFetch`.
    pub request: Request,
    /// Why the fetch failed.
    pub error: StrategyError,
    /// The event being handled.
    pub event: FetchEvent,
    /// This plugin's state for the request.
    pub state: PluginState,
}

/// Parameters of `handlerWillStart`.
#[derive(Debug, Clone)]
pub struct HandlerWillStartParams {
    /// The handled request.
    pub request: Request,
    /// The event being handled.
    pub event: FetchEvent,
    /// This plugin's state for the request.
    pub state: PluginState,
}

/// Parameters of `handlerWillRespond`.
#[derive(Debug, Clone)]
pub struct HandlerWillRespondParams {
    /// The handled request.
    pub request: Request,
    /// Response produced so far.
    pub response: Response,
    /// The event being handled.
    pub event: FetchEvent,
    /// This plugin's state for the request.
    pub state: PluginState,
}

/// Parameters of `handlerDidRespond`.
#[derive(Debug, Clone)]
pub struct HandlerDidRespondParams {
    /// The handled request.
    pub request: Request,
    /// Final response, `None` when handling failed.
    pub response: Option<Response>,
    /// The event being handled.
    pub event: FetchEvent,
    /// This plugin's state for the request.
    pub state: PluginState,
}

/// Parameters of `handlerDidComplete`.
#[derive(Debug, Clone)]
pub struct HandlerDidCompleteParams {
    /// The handled request.
    pub request: Request,
    /// Final response, `None` when handling failed.
    pub response: Option<Response>,
    /// First failure of the extended-lifetime work, if any.
    pub error: Option<StrategyError>,
    /// The event being handled.
    pub event: FetchEvent,
    /// This plugin's state for the request.
    pub state: PluginState,
}

/// Parameters of `handlerDidError`.
#[derive(Debug, Clone)]
pub struct HandlerDidErrorParams {
    /// The handled request.
    pub request: Request,
    /// Why handling failed.
    pub error: StrategyError,
    /// The event being handled.
    pub event: FetchEvent,
    /// This plugin's state for the request.
    pub state: PluginState,
}
