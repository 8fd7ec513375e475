//! Lifecycle plugins.
//!
//! A [`Plugin`] is a set of optional callbacks, one per [`LifecyclePoint`].
//! Strategies hold an ordered list of plugins and the handler invokes the
//! matching callbacks at each point, in list order, through a
//! [`PluginPipeline`].
//!
//! Callbacks take their parameters by value and return a boxed `'static`
//! future, so plugins can freely move requests and responses into spawned
//! work. Each plugin also receives a [`PluginState`] that lives for exactly one
//! handled request.
//!
//! ```
//! use swkit::plugin::Plugin;
//!
//! let only_ok = Plugin::builder("only-ok")
//!     .cache_will_update(|params| async move {
//!         Ok((params.response.status() == 200).then_some(params.response))
//!     })
//!     .build();
//!
//! assert!(only_ok.has(swkit::plugin::LifecyclePoint::CacheWillUpdate));
//! ```

mod params;
pub mod pipeline;
mod state;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use smol_str::SmolStr;
use swkit_core::{Request, Response};

pub use params::{
    CacheDidUpdateParams, CacheKeyMode, CacheKeyWillBeUsedParams, CacheWillUpdateParams,
    CachedResponseWillBeUsedParams, FetchDidFailParams, FetchDidSucceedParams,
    HandlerDidCompleteParams, HandlerDidErrorParams, HandlerDidRespondParams,
    HandlerWillRespondParams, HandlerWillStartParams, RequestWillFetchParams,
};
pub use pipeline::PluginPipeline;
pub use state::PluginState;

use crate::error::PluginError;

/// Result of a plugin callback.
pub type PluginResult<T> = Result<T, PluginError>;

/// A type-erased plugin callback.
pub type Callback<P, T> = Arc<dyn Fn(P) -> BoxFuture<'static, PluginResult<T>> + Send + Sync>;

/// Named moments during request handling where plugins run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePoint {
    /// Replace the cache key before a read or write.
    CacheKeyWillBeUsed,
    /// Decide whether a response may be written.
    CacheWillUpdate,
    /// Replace or reject a cached response before it is used.
    CachedResponseWillBeUsed,
    /// Observe a completed cache write.
    CacheDidUpdate,
    /// Replace the outgoing request.
    RequestWillFetch,
    /// Replace a fetched response.
    FetchDidSucceed,
    /// Observe a failed fetch.
    FetchDidFail,
    /// Observe the start of handling.
    HandlerWillStart,
    /// Replace the final response.
    HandlerWillRespond,
    /// Observe the final response.
    HandlerDidRespond,
    /// Observe the end of handling, after all extended work settled.
    HandlerDidComplete,
    /// Offer a fallback response for a failed request.
    HandlerDidError,
}

impl LifecyclePoint {
    /// Callback name as used in plugin documentation and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePoint::CacheKeyWillBeUsed => "cacheKeyWillBeUsed",
            LifecyclePoint::CacheWillUpdate => "cacheWillUpdate",
            LifecyclePoint::CachedResponseWillBeUsed => "cachedResponseWillBeUsed",
            LifecyclePoint::CacheDidUpdate => "cacheDidUpdate",
            LifecyclePoint::RequestWillFetch => "requestWillFetch",
            LifecyclePoint::FetchDidSucceed => "fetchDidSucceed",
            LifecyclePoint::FetchDidFail => "fetchDidFail",
            LifecyclePoint::HandlerWillStart => "handlerWillStart",
            LifecyclePoint::HandlerWillRespond => "handlerWillRespond",
            LifecyclePoint::HandlerDidRespond => "handlerDidRespond",
            LifecyclePoint::HandlerDidComplete => "handlerDidComplete",
            LifecyclePoint::HandlerDidError => "handlerDidError",
        }
    }
}

impl fmt::Display for LifecyclePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn erase<P, T, F, Fut>(callback: F) -> Callback<P, T>
where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PluginResult<T>> + Send + 'static,
{
    Arc::new(move |params| callback(params).boxed())
}

/// A set of lifecycle callbacks.
///
/// Cloning a plugin is cheap; clones share their callbacks.
#[derive(Clone, Default)]
pub struct Plugin {
    name: SmolStr,
    pub(crate) cache_key_will_be_used: Option<Callback<CacheKeyWillBeUsedParams, Request>>,
    pub(crate) cache_will_update: Option<Callback<CacheWillUpdateParams, Option<Response>>>,
    pub(crate) cached_response_will_be_used:
        Option<Callback<CachedResponseWillBeUsedParams, Option<Response>>>,
    pub(crate) cache_did_update: Option<Callback<CacheDidUpdateParams, ()>>,
    pub(crate) request_will_fetch: Option<Callback<RequestWillFetchParams, Request>>,
    pub(crate) fetch_did_succeed: Option<Callback<FetchDidSucceedParams, Response>>,
    pub(crate) fetch_did_fail: Option<Callback<FetchDidFailParams, ()>>,
    pub(crate) handler_will_start: Option<Callback<HandlerWillStartParams, ()>>,
    pub(crate) handler_will_respond: Option<Callback<HandlerWillRespondParams, Response>>,
    pub(crate) handler_did_respond: Option<Callback<HandlerDidRespondParams, ()>>,
    pub(crate) handler_did_complete: Option<Callback<HandlerDidCompleteParams, ()>>,
    pub(crate) handler_did_error: Option<Callback<HandlerDidErrorParams, Option<Response>>>,
}

impl Plugin {
    /// Starts building a plugin called `name`.
    pub fn builder(name: impl Into<SmolStr>) -> PluginBuilder {
        PluginBuilder {
            plugin: Plugin {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    /// Name given at construction, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this plugin has a callback for `point`.
    pub fn has(&self, point: LifecyclePoint) -> bool {
        match point {
            LifecyclePoint::CacheKeyWillBeUsed => self.cache_key_will_be_used.is_some(),
            LifecyclePoint::CacheWillUpdate => self.cache_will_update.is_some(),
            LifecyclePoint::CachedResponseWillBeUsed => {
                self.cached_response_will_be_used.is_some()
            }
            LifecyclePoint::CacheDidUpdate => self.cache_did_update.is_some(),
            LifecyclePoint::RequestWillFetch => self.request_will_fetch.is_some(),
            LifecyclePoint::FetchDidSucceed => self.fetch_did_succeed.is_some(),
            LifecyclePoint::FetchDidFail => self.fetch_did_fail.is_some(),
            LifecyclePoint::HandlerWillStart => self.handler_will_start.is_some(),
            LifecyclePoint::HandlerWillRespond => self.handler_will_respond.is_some(),
            LifecyclePoint::HandlerDidRespond => self.handler_did_respond.is_some(),
            LifecyclePoint::HandlerDidComplete => self.handler_did_complete.is_some(),
            LifecyclePoint::HandlerDidError => self.handler_did_error.is_some(),
        }
    }

    fn points(&self) -> Vec<LifecyclePoint> {
        [
            LifecyclePoint::CacheKeyWillBeUsed,
            LifecyclePoint::CacheWillUpdate,
            LifecyclePoint::CachedResponseWillBeUsed,
            LifecyclePoint::CacheDidUpdate,
            LifecyclePoint::RequestWillFetch,
            LifecyclePoint::FetchDidSucceed,
            LifecyclePoint::FetchDidFail,
            LifecyclePoint::HandlerWillStart,
            LifecyclePoint::HandlerWillRespond,
            LifecyclePoint::HandlerDidRespond,
            LifecyclePoint::HandlerDidComplete,
            LifecyclePoint::HandlerDidError,
        ]
        .into_iter()
        .filter(|point| self.has(*point))
        .collect()
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("callbacks", &self.points())
            .finish()
    }
}

/// Builder for [`Plugin`].
#[derive(Debug)]
pub struct PluginBuilder {
    plugin: Plugin,
}

macro_rules! callback_setter {
    ($(#[$doc:meta])* $name:ident, $params:ty, $output:ty) => {
        $(#[$doc])*
        pub fn $name<F, Fut>(mut self, callback: F) -> Self
        where
            F: Fn($params) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = PluginResult<$output>> + Send + 'static,
        {
            self.plugin.$name = Some(erase(callback));
            self
        }
    };
}

impl PluginBuilder {
    callback_setter!(
        /// Replaces the cache key. Receives the key produced by the previous plugin.
        cache_key_will_be_used, CacheKeyWillBeUsedParams, Request
    );
    callback_setter!(
        /// Returns the response to write, or `None` to skip the write.
        cache_will_update, CacheWillUpdateParams, Option<Response>
    );
    callback_setter!(
        /// Returns the cached response to use, or `None` to treat it as a miss.
        cached_response_will_be_used, CachedResponseWillBeUsedParams, Option<Response>
    );
    callback_setter!(
        /// Called after a response was written.
        cache_did_update, CacheDidUpdateParams, ()
    );
    callback_setter!(
        /// Replaces the request sent to the network. An error aborts the fetch.
        request_will_fetch, RequestWillFetchParams, Request
    );
    callback_setter!(
        /// Replaces a response received from the network.
        fetch_did_succeed, FetchDidSucceedParams, Response
    );
    callback_setter!(
        /// Called when a fetch fails.
        fetch_did_fail, FetchDidFailParams, ()
    );
    callback_setter!(
        /// Called before the strategy starts.
        handler_will_start, HandlerWillStartParams, ()
    );
    callback_setter!(
        /// Replaces the response about to be returned.
        handler_will_respond, HandlerWillRespondParams, Response
    );
    callback_setter!(
        /// Called once the response is available.
        handler_did_respond, HandlerDidRespondParams, ()
    );
    callback_setter!(
        /// Called when handling is complete, including extended-lifetime work.
        handler_did_complete, HandlerDidCompleteParams, ()
    );
    callback_setter!(
        /// Returns a fallback response for a failed request.
        handler_did_error, HandlerDidErrorParams, Option<Response>
    );

    /// Builds the plugin.
    pub fn build(self) -> Plugin {
        self.plugin
    }
}

impl From<PluginBuilder> for Plugin {
    fn from(builder: PluginBuilder) -> Self {
        builder.build()
    }
}
