//! Plugin invocation.
//!
//! Every lifecycle point is driven by one of four combinators:
//!
//! - [`chain_transform`]: each callback receives the previous callback's
//!   output and returns a replacement.
//! - [`veto`]: like `chain_transform`, but `None` rejects the value and stops
//!   the chain.
//! - [`fire_and_collect`]: each callback observes the same inputs; results
//!   are discarded and the first error propagates.
//! - [`recover`]: each callback may offer a fallback; every callback runs and
//!   the first fallback offered wins.
//!
//! All combinators run callbacks strictly in plugin order, one at a time.
//! [`PluginPipeline`] binds them to the typed lifecycle points of one
//! handled request.

use smol_str::SmolStr;
use swkit_core::{CacheQueryOptions, FetchEvent, Request, Response};

use super::{
    CacheDidUpdateParams, CacheKeyMode, CacheKeyWillBeUsedParams, CacheWillUpdateParams,
    CachedResponseWillBeUsedParams, Callback, FetchDidFailParams, FetchDidSucceedParams,
    HandlerDidCompleteParams, HandlerDidErrorParams, HandlerDidRespondParams,
    HandlerWillRespondParams, HandlerWillStartParams, LifecyclePoint, Plugin, PluginResult,
    PluginState, RequestWillFetchParams,
};
use crate::error::StrategyError;
use crate::routing::RouteParams;

/// Threads `initial` through every callback.
pub async fn chain_transform<'a, P, T, I, F>(
    callbacks: I,
    initial: T,
    mut params: F,
) -> PluginResult<T>
where
    I: IntoIterator<Item = (&'a Callback<P, T>, &'a PluginState)>,
    P: 'static,
    T: 'static,
    F: FnMut(T, PluginState) -> P,
{
    let mut value = initial;
    for (callback, state) in callbacks {
        value = callback(params(value, state.clone())).await?;
    }
    Ok(value)
}

/// Threads `initial` through every callback until one returns `None`.
pub async fn veto<'a, P, T, I, F>(
    callbacks: I,
    initial: T,
    mut params: F,
) -> PluginResult<Option<T>>
where
    I: IntoIterator<Item = (&'a Callback<P, Option<T>>, &'a PluginState)>,
    P: 'static,
    T: 'static,
    F: FnMut(T, PluginState) -> P,
{
    let mut value = initial;
    for (callback, state) in callbacks {
        match callback(params(value, state.clone())).await? {
            Some(next) => value = next,
            None => return Ok(None),
        }
    }
    Ok(Some(value))
}

/// Invokes every callback. Returns how many ran.
pub async fn fire_and_collect<'a, P, I, F>(callbacks: I, mut params: F) -> PluginResult<usize>
where
    I: IntoIterator<Item = (&'a Callback<P, ()>, &'a PluginState)>,
    P: 'static,
    F: FnMut(PluginState) -> P,
{
    let mut invoked = 0;
    for (callback, state) in callbacks {
        callback(params(state.clone())).await?;
        invoked += 1;
    }
    Ok(invoked)
}

/// Invokes every callback and keeps the first fallback offered.
pub async fn recover<'a, P, T, I, F>(callbacks: I, mut params: F) -> PluginResult<Option<T>>
where
    I: IntoIterator<Item = (&'a Callback<P, Option<T>>, &'a PluginState)>,
    P: 'static,
    T: 'static,
    F: FnMut(PluginState) -> P,
{
    let mut fallback = None;
    for (callback, state) in callbacks {
        let offered = callback(params(state.clone())).await?;
        if fallback.is_none() {
            fallback = offered;
        }
    }
    Ok(fallback)
}

#[derive(Debug)]
struct Entry {
    plugin: Plugin,
    state: PluginState,
}

/// The plugins of one strategy, bound to one handled request.
///
/// Each plugin gets a fresh [`PluginState`] when the pipeline is created.
#[derive(Debug)]
pub struct PluginPipeline {
    entries: Vec<Entry>,
    event: FetchEvent,
}

macro_rules! callbacks {
    ($pipeline:expr, $field:ident) => {
        $pipeline
            .entries
            .iter()
            .filter_map(|entry| {
                entry
                    .plugin
                    .$field
                    .as_ref()
                    .map(|callback| (callback, &entry.state))
            })
            .collect::<Vec<_>>()
    };
}

impl PluginPipeline {
    /// Binds `plugins` to `event`.
    pub fn new(plugins: &[Plugin], event: FetchEvent) -> Self {
        PluginPipeline {
            entries: plugins
                .iter()
                .map(|plugin| Entry {
                    plugin: plugin.clone(),
                    state: PluginState::new(),
                })
                .collect(),
            event,
        }
    }

    /// Whether any plugin has a callback for `point`.
    pub fn has(&self, point: LifecyclePoint) -> bool {
        self.entries.iter().any(|entry| entry.plugin.has(point))
    }

    /// State of the plugin at `index`.
    pub fn state(&self, index: usize) -> Option<&PluginState> {
        self.entries.get(index).map(|entry| &entry.state)
    }

    pub(crate) async fn cache_key_will_be_used(
        &self,
        request: Request,
        mode: CacheKeyMode,
        params: Option<RouteParams>,
    ) -> Result<Request, StrategyError> {
        chain_transform(callbacks!(self, cache_key_will_be_used), request, |request, state| {
            CacheKeyWillBeUsedParams {
                request,
                mode,
                params: params.clone(),
                event: self.event.clone(),
                state,
            }
        })
        .await
        .map_err(StrategyError::plugin(LifecyclePoint::CacheKeyWillBeUsed))
    }

    pub(crate) async fn cache_will_update(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Option<Response>, StrategyError> {
        veto(callbacks!(self, cache_will_update), response, |response, state| {
            CacheWillUpdateParams {
                request: request.clone(),
                response,
                event: self.event.clone(),
                state,
            }
        })
        .await
        .map_err(StrategyError::plugin(LifecyclePoint::CacheWillUpdate))
    }

    pub(crate) async fn cached_response_will_be_used(
        &self,
        cache_name: &SmolStr,
        request: &Request,
        cached_response: Option<Response>,
        match_options: Option<CacheQueryOptions>,
    ) -> Result<Option<Response>, StrategyError> {
        chain_transform(
            callbacks!(self, cached_response_will_be_used),
            cached_response,
            |cached_response, state| CachedResponseWillBeUsedParams {
                cache_name: cache_name.clone(),
                request: request.clone(),
                cached_response,
                match_options,
                event: self.event.clone(),
                state,
            },
        )
        .await
        .map_err(StrategyError::plugin(LifecyclePoint::CachedResponseWillBeUsed))
    }

    pub(crate) async fn cache_did_update(
        &self,
        cache_name: &SmolStr,
        request: &Request,
        old_response: Option<Response>,
        new_response: &Response,
    ) -> Result<(), StrategyError> {
        fire_and_collect(callbacks!(self, cache_did_update), |state| CacheDidUpdateParams {
            cache_name: cache_name.clone(),
            request: request.clone(),
            old_response: old_response.clone(),
            new_response: new_response.clone(),
            event: self.event.clone(),
            state,
        })
        .await
        .map(drop)
        .map_err(StrategyError::plugin(LifecyclePoint::CacheDidUpdate))
    }

    pub(crate) async fn request_will_fetch(&self, request: Request) -> PluginResult<Request> {
        chain_transform(callbacks!(self, request_will_fetch), request, |request, state| {
            RequestWillFetchParams {
                request,
                event: self.event.clone(),
                state,
            }
        })
        .await
    }

    pub(crate) async fn fetch_did_succeed(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Response, StrategyError> {
        chain_transform(callbacks!(self, fetch_did_succeed), response, |response, state| {
            FetchDidSucceedParams {
                request: request.clone(),
                response,
                event: self.event.clone(),
                state,
            }
        })
        .await
        .map_err(StrategyError::plugin(LifecyclePoint::FetchDidSucceed))
    }

    pub(crate) async fn fetch_did_fail(
        &self,
        original_request: &Request,
        request: &Request,
        error: &StrategyError,
    ) -> Result<(), StrategyError> {
        fire_and_collect(callbacks!(self, fetch_did_fail), |state| FetchDidFailParams {
            original_request: original_request.clone(),
            request: request.clone(),
            error: error.clone(),
            event: self.event.clone(),
            state,
        })
        .await
        .map(drop)
        .map_err(StrategyError::plugin(LifecyclePoint::FetchDidFail))
    }

    pub(crate) async fn handler_will_start(&self, request: &Request) -> Result<(), StrategyError> {
        fire_and_collect(callbacks!(self, handler_will_start), |state| HandlerWillStartParams {
            request: request.clone(),
            event: self.event.clone(),
            state,
        })
        .await
        .map(drop)
        .map_err(StrategyError::plugin(LifecyclePoint::HandlerWillStart))
    }

    pub(crate) async fn handler_will_respond(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Response, StrategyError> {
        chain_transform(callbacks!(self, handler_will_respond), response, |response, state| {
            HandlerWillRespondParams {
                request: request.clone(),
                response,
                event: self.event.clone(),
                state,
            }
        })
        .await
        .map_err(StrategyError::plugin(LifecyclePoint::HandlerWillRespond))
    }

    pub(crate) async fn handler_did_respond(
        &self,
        request: &Request,
        response: Option<&Response>,
    ) -> Result<(), StrategyError> {
        fire_and_collect(callbacks!(self, handler_did_respond), |state| HandlerDidRespondParams {
            request: request.clone(),
            response: response.cloned(),
            event: self.event.clone(),
            state,
        })
        .await
        .map(drop)
        .map_err(StrategyError::plugin(LifecyclePoint::HandlerDidRespond))
    }

    pub(crate) async fn handler_did_complete(
        &self,
        request: &Request,
        response: Option<&Response>,
        error: Option<&StrategyError>,
    ) -> Result<(), StrategyError> {
        fire_and_collect(callbacks!(self, handler_did_complete), |state| {
            HandlerDidCompleteParams {
                request: request.clone(),
                response: response.cloned(),
                error: error.cloned(),
                event: self.event.clone(),
                state,
            }
        })
        .await
        .map(drop)
        .map_err(StrategyError::plugin(LifecyclePoint::HandlerDidComplete))
    }

    pub(crate) async fn handler_did_error(
        &self,
        request: &Request,
        error: &StrategyError,
    ) -> Result<Option<Response>, StrategyError> {
        recover(callbacks!(self, handler_did_error), |state| HandlerDidErrorParams {
            request: request.clone(),
            error: error.clone(),
            event: self.event.clone(),
            state,
        })
        .await
        .map_err(StrategyError::plugin(LifecyclePoint::HandlerDidError))
    }
}
