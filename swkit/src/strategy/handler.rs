use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use http::Method;
use smol_str::SmolStr;
use swkit_core::{
    Cache, CacheError, CacheQueryOptions, CacheResult, ExtendLifetime, FetchEvent,
    MultiCacheQueryOptions, Request, RequestMode, Response,
};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::Strategy;
use crate::error::StrategyError;
use crate::metrics;
use crate::plugin::{CacheKeyMode, LifecyclePoint, PluginPipeline};
use crate::quota;
use crate::routing::{HandlerOptions, RouteParams};

/// Query parameter carrying a precache revision, ignored when looking up the
/// entry a write replaces.
const REVISION_PARAM: &str = "__WB_REVISION__";

pub(crate) type Tracked<T> = Shared<BoxFuture<'static, Result<T, StrategyError>>>;

struct HandlerInner {
    strategy: Strategy,
    request: Request,
    event: FetchEvent,
    params: Option<RouteParams>,
    pipeline: PluginPipeline,
    cache_keys: DashMap<(String, CacheKeyMode), Request>,
    lifetime: ExtendLifetime<StrategyError>,
}

/// Per-request context of a running strategy.
///
/// All cache and network access of a strategy goes through the handler, which
/// runs the strategy's plugins around every operation and tracks background
/// work (such as cache writes) that must finish before handling is complete.
/// Cheap to clone.
#[derive(Clone)]
pub struct StrategyHandler {
    inner: Arc<HandlerInner>,
}

impl StrategyHandler {
    pub(crate) fn new(strategy: Strategy, options: HandlerOptions) -> Self {
        let pipeline = PluginPipeline::new(strategy.plugins(), options.event.clone());
        StrategyHandler {
            inner: Arc::new(HandlerInner {
                strategy,
                request: options.request,
                event: options.event,
                params: options.params,
                pipeline,
                cache_keys: DashMap::new(),
                lifetime: ExtendLifetime::new(),
            }),
        }
    }

    /// The request being handled.
    pub fn request(&self) -> &Request {
        &self.inner.request
    }

    /// The event the request came from.
    pub fn event(&self) -> &FetchEvent {
        &self.inner.event
    }

    /// Route parameters, if the request was routed.
    pub fn params(&self) -> Option<&RouteParams> {
        self.inner.params.as_ref()
    }

    /// The strategy running this handler.
    pub fn strategy(&self) -> &Strategy {
        &self.inner.strategy
    }

    /// The strategy's plugins bound to this request.
    pub fn pipeline(&self) -> &PluginPipeline {
        &self.inner.pipeline
    }

    /// Whether any plugin has a callback for `point`.
    pub fn has_callback(&self, point: LifecyclePoint) -> bool {
        self.inner.pipeline.has(point)
    }

    /// Fetches `request` from the network through the fetch plugins.
    ///
    /// Navigation requests use the event's preload response when there is one.
    /// `requestWillFetch` may replace the request; `fetchDidSucceed` may replace
    /// the response. A failed fetch is reported to `fetchDidFail` with both the
    /// original and the plugin-filtered request before it propagates.
    pub async fn fetch(&self, request: Request) -> Result<Response, StrategyError> {
        if request.mode() == RequestMode::Navigate {
            if let Some(preloaded) = self.inner.event.preload_response() {
                debug!(url = %request.url(), "using the navigation preload response");
                return Ok(preloaded);
            }
        }

        let pipeline = &self.inner.pipeline;
        let original_request = pipeline
            .has(LifecyclePoint::FetchDidFail)
            .then(|| request.clone());

        let request = pipeline
            .request_will_fetch(request)
            .await
            .map_err(|error| StrategyError::RequestWillFetch {
                message: error.to_string(),
            })?;
        let filtered_request = request.clone();

        let strategy = self.strategy();
        let fetch_options = match request.mode() {
            RequestMode::Navigate => None,
            _ => strategy.fetch_options(),
        };

        let result = match strategy.platform().fetcher().fetch(request, fetch_options).await {
            Ok(response) => {
                debug!(
                    url = %filtered_request.url(),
                    status = response.status(),
                    "network request returned"
                );
                pipeline.fetch_did_succeed(&filtered_request, response).await
            }
            Err(error) => Err(StrategyError::from(error)),
        };
        metrics::record_fetch(result.is_ok());

        if let Err(error) = &result {
            debug!(url = %filtered_request.url(), %error, "network request failed");
            if let Some(original_request) = &original_request {
                pipeline
                    .fetch_did_fail(original_request, &filtered_request, error)
                    .await?;
            }
        }
        result
    }

    /// Fetches `request` and, without delaying the response, writes a copy
    /// into the strategy's cache as extended-lifetime work.
    pub async fn fetch_and_cache_put(&self, request: Request) -> Result<Response, StrategyError> {
        let response = self.fetch(request.clone()).await?;
        let handler = self.clone();
        let to_cache = response.clone();
        self.wait_until("cache_put", async move {
            handler.cache_put(request, to_cache).await.map(drop)
        });
        Ok(response)
    }

    /// Looks `key` up in the strategy's cache.
    ///
    /// The key goes through `cacheKeyWillBeUsed` (read mode) and the result
    /// through `cachedResponseWillBeUsed`, either of which may turn a hit into
    /// a miss.
    pub async fn cache_match(&self, key: Request) -> Result<Option<Response>, StrategyError> {
        let strategy = self.strategy();
        let cache_name = strategy.cache_name();
        let effective = self.get_cache_key(key, CacheKeyMode::Read).await?;

        let options = MultiCacheQueryOptions {
            query: strategy.match_options().unwrap_or_default(),
            cache_name: Some(cache_name.clone()),
        };
        let cached = strategy
            .platform()
            .caches()
            .match_request(&effective, &options)
            .await?;

        metrics::record_cache_lookup(cache_name, cached.is_some());
        if cached.is_some() {
            debug!(cache = %cache_name, url = %effective.url(), "found a cached response");
        } else {
            debug!(cache = %cache_name, url = %effective.url(), "no cached response");
        }

        self.inner
            .pipeline
            .cached_response_will_be_used(cache_name, &effective, cached, strategy.match_options())
            .await
    }

    /// Writes `response` under `key` into the strategy's cache.
    ///
    /// Returns `Ok(false)` when the response was judged not cacheable: by the
    /// `cacheWillUpdate` plugins, or, when there are none, because its status
    /// is not 200. A quota failure runs the registered quota callbacks before
    /// it propagates.
    pub async fn cache_put(&self, key: Request, response: Response) -> Result<bool, StrategyError> {
        let strategy = self.strategy();
        let cache_name = strategy.cache_name();
        let effective = self.get_cache_key(key, CacheKeyMode::Write).await?;

        if effective.method() != Method::GET {
            return Err(CacheError::NonGetRequest {
                method: effective.method().clone(),
                url: effective.url(),
            }
            .into());
        }

        let Some(response) = self.ensure_cacheable(&effective, response).await? else {
            debug!(cache = %cache_name, url = %effective.url(), "response will not be cached");
            metrics::record_cache_write(cache_name, false);
            return Ok(false);
        };

        let cache = strategy.platform().caches().open(cache_name).await?;
        let pipeline = &self.inner.pipeline;

        let old_response = if pipeline.has(LifecyclePoint::CacheDidUpdate) {
            match_ignoring_params(
                cache.as_ref(),
                &effective,
                &[REVISION_PARAM],
                strategy.match_options().unwrap_or_default(),
            )
            .await?
        } else {
            None
        };

        debug!(cache = %cache_name, url = %effective.url(), "updating the cache");
        if let Err(error) = cache.put(effective.clone(), response.clone()).await {
            if error.is_quota_exceeded() {
                warn!(
                    cache = %cache_name,
                    url = %effective.url(),
                    "quota exceeded while writing to the cache"
                );
                quota::execute_quota_error_callbacks().await?;
            }
            return Err(error.into());
        }
        metrics::record_cache_write(cache_name, true);

        pipeline
            .cache_did_update(cache_name, &effective, old_response, &response)
            .await?;
        Ok(true)
    }

    async fn ensure_cacheable(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Option<Response>, StrategyError> {
        let pipeline = &self.inner.pipeline;
        if pipeline.has(LifecyclePoint::CacheWillUpdate) {
            return pipeline.cache_will_update(request, response).await;
        }

        match response.status() {
            200 => Ok(Some(response)),
            0 => {
                warn!(
                    url = %request.url(),
                    "opaque response is not cached without a cacheWillUpdate plugin that accepts it"
                );
                Ok(None)
            }
            status => {
                debug!(url = %request.url(), status, "response status is not cacheable");
                Ok(None)
            }
        }
    }

    /// The cache key for `request`, after `cacheKeyWillBeUsed` plugins.
    ///
    /// Memoized per URL and mode for the lifetime of the handler.
    pub async fn get_cache_key(
        &self,
        request: Request,
        mode: CacheKeyMode,
    ) -> Result<Request, StrategyError> {
        let memo = (request.url(), mode);
        let cached = self.inner.cache_keys.get(&memo).map(|key| key.clone());
        if let Some(key) = cached {
            return Ok(key);
        }

        let effective = self
            .inner
            .pipeline
            .cache_key_will_be_used(request, mode, self.inner.params.clone())
            .await?;
        self.inner.cache_keys.insert(memo, effective.clone());
        Ok(effective)
    }

    /// Runs `task` as extended-lifetime work of this handler.
    ///
    /// Its failure does not affect the response but is reported by
    /// [`StrategyHandler::done_waiting`].
    pub fn wait_until<F>(&self, kind: &'static str, task: F)
    where
        F: Future<Output = Result<(), StrategyError>> + Send + 'static,
    {
        self.inner.lifetime.wait_until(kind, task);
    }

    /// Spawns `task` as extended-lifetime work and returns a shareable handle
    /// to its result.
    ///
    /// The task keeps running when every handle is dropped, and its own
    /// failure is only seen through the handles.
    pub(crate) fn spawn_tracked<T, F>(&self, kind: &'static str, task: F) -> Tracked<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Future<Output = Result<T, StrategyError>> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        self.wait_until(kind, async move {
            let _ = sender.send(task.await);
            Ok(())
        });
        receiver
            .map(|received| {
                received.unwrap_or_else(|_| {
                    Err(StrategyError::Task(SmolStr::new_static(
                        "tracked task dropped",
                    )))
                })
            })
            .boxed()
            .shared()
    }

    /// Number of extended-lifetime tasks not yet awaited.
    pub fn pending(&self) -> usize {
        self.inner.lifetime.len()
    }

    /// Waits for all extended-lifetime work, including work added while
    /// waiting, and returns the first failure.
    pub async fn done_waiting(&self) -> Result<(), StrategyError> {
        self.inner.lifetime.join().await
    }
}

impl fmt::Debug for StrategyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyHandler")
            .field("strategy", &self.inner.strategy.kind())
            .field("url", &self.inner.request.uri())
            .field("pending", &self.pending())
            .finish()
    }
}

fn strip_params(request: &Request, ignored: &[&str]) -> String {
    let Some(query) = request.uri().query() else {
        return request.url();
    };
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            let name = pair.split('=').next().unwrap_or_default();
            !pair.is_empty() && !ignored.contains(&name)
        })
        .collect();

    let base = request.url_without_search();
    if kept.is_empty() {
        base
    } else {
        format!("{base}?{}", kept.join("&"))
    }
}

/// Finds the entry `request` would replace, treating URLs that differ only in
/// the `ignored` query parameters as equal.
async fn match_ignoring_params(
    cache: &dyn Cache,
    request: &Request,
    ignored: &[&str],
    options: CacheQueryOptions,
) -> CacheResult<Option<Response>> {
    let stripped = strip_params(request, ignored);
    if stripped == request.url() {
        return cache.match_request(request, &options).await;
    }

    let base = request.url_without_search();
    for key in cache.keys().await? {
        if key.url_without_search() == base && strip_params(&key, ignored) == stripped {
            return cache.match_request(&key, &options).await;
        }
    }
    Ok(None)
}
