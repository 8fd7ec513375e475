//! Ready-made routes for common kinds of resources.
//!
//! Each recipe registers one route on a [`Router`] and returns a [`Recipe`]
//! holding the strategy it built. URLs listed in `warm_cache` are fetched
//! into the strategy's cache by [`Recipe::warm`]. Relative URLs are resolved
//! against the router's origin.
//!
//! ```no_run
//! # async fn run(platform: swkit::Platform) -> Result<(), Box<dyn std::error::Error>> {
//! use swkit::recipes::{self, PageCacheOptions};
//! use swkit::routing::Router;
//!
//! let mut router = Router::new("https://app.test");
//! let pages = recipes::page_cache(
//!     &mut router,
//!     platform,
//!     PageCacheOptions {
//!         warm_cache: vec!["/".into(), "/offline".into()],
//!         ..Default::default()
//!     },
//! )?;
//! pages.warm().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use futures::future::try_join_all;
use smol_str::SmolStr;
use swkit_core::{FetchError, FetchEvent, Request, RequestDestination};
use tracing::debug;

use crate::error::{ConfigError, StrategyError};
use crate::platform::Platform;
use crate::plugin::Plugin;
use crate::plugins::{
    CacheableResponseOptions, ExpirationOptions, ExpirationPlugin, cacheable_response_plugin,
};
use crate::routing::{Matcher, Route, Router};
use crate::strategy::Strategy;

const PAGE_CACHE: &str = "pages";
const PAGE_NETWORK_TIMEOUT: Duration = Duration::from_secs(3);
const IMAGE_CACHE: &str = "images";
const IMAGE_MAX_ENTRIES: usize = 60;
const IMAGE_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);
const STATIC_RESOURCE_CACHE: &str = "static-resources";

/// Options of [`page_cache`].
#[derive(Debug, Clone, Default)]
pub struct PageCacheOptions {
    /// Defaults to `pages`.
    pub cache_name: Option<SmolStr>,
    /// Defaults to navigation requests.
    pub matcher: Option<Matcher>,
    /// Defaults to 3 seconds.
    pub network_timeout: Option<Duration>,
    /// Extra plugins, run before the bundled ones.
    pub plugins: Vec<Plugin>,
    /// URLs to put into the cache up front.
    pub warm_cache: Vec<String>,
}

/// Options of [`image_cache`].
#[derive(Debug, Clone, Default)]
pub struct ImageCacheOptions {
    /// Defaults to `images`.
    pub cache_name: Option<SmolStr>,
    /// Defaults to requests with an image destination.
    pub matcher: Option<Matcher>,
    /// Defaults to 60.
    pub max_entries: Option<usize>,
    /// Defaults to 30 days.
    pub max_age: Option<Duration>,
    /// Extra plugins, run before the bundled ones.
    pub plugins: Vec<Plugin>,
    /// URLs to put into the cache up front.
    pub warm_cache: Vec<String>,
}

/// Options of [`static_resource_cache`].
#[derive(Debug, Clone, Default)]
pub struct StaticResourceCacheOptions {
    /// Defaults to `static-resources`.
    pub cache_name: Option<SmolStr>,
    /// Defaults to script and style requests.
    pub matcher: Option<Matcher>,
    /// Extra plugins, run before the bundled ones.
    pub plugins: Vec<Plugin>,
    /// URLs to put into the cache up front.
    pub warm_cache: Vec<String>,
}

/// A strategy registered by a recipe.
#[derive(Debug, Clone)]
pub struct Recipe {
    strategy: Strategy,
    warm_cache: Vec<String>,
}

impl Recipe {
    /// The strategy serving the recipe's route.
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// URLs fetched by [`Recipe::warm`].
    pub fn warm_cache(&self) -> &[String] {
        &self.warm_cache
    }

    /// Runs every warm-cache URL through the strategy and waits until all
    /// of them are cached.
    pub async fn warm(&self) -> Result<(), StrategyError> {
        warm_strategy_cache(&self.strategy, &self.warm_cache).await
    }
}

fn statuses_0_and_200() -> Result<Plugin, ConfigError> {
    cacheable_response_plugin(CacheableResponseOptions::default().statuses([0, 200]))
}

fn resolve(router: &Router, urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .map(|url| match router.origin() {
            Some(origin) if url.starts_with('/') => format!("{origin}{url}"),
            _ => url,
        })
        .collect()
}

fn register(
    router: &mut Router,
    matcher: Matcher,
    strategy: &Strategy,
    warm_cache: Vec<String>,
) -> Recipe {
    router.register_route(Route::new(matcher, strategy.clone()));
    debug!(
        strategy = strategy.kind().name(),
        cache = %strategy.cache_name(),
        "registered recipe route"
    );
    Recipe {
        strategy: strategy.clone(),
        warm_cache: resolve(router, warm_cache),
    }
}

/// Network-first caching of pages, falling back to the cache after a timeout.
pub fn page_cache(
    router: &mut Router,
    platform: Platform,
    options: PageCacheOptions,
) -> Result<Recipe, ConfigError> {
    let strategy = Strategy::network_first(platform)
        .cache_name(options.cache_name.unwrap_or_else(|| SmolStr::new_static(PAGE_CACHE)))
        .network_timeout(options.network_timeout.unwrap_or(PAGE_NETWORK_TIMEOUT))
        .plugins(options.plugins)
        .plugin(statuses_0_and_200()?)
        .build();
    let matcher = options.matcher.unwrap_or_else(Matcher::navigation);
    Ok(register(router, matcher, &strategy, options.warm_cache))
}

/// Cache-first caching of images with entry count and age limits.
pub fn image_cache(
    router: &mut Router,
    platform: Platform,
    options: ImageCacheOptions,
) -> Result<Recipe, ConfigError> {
    let expiration = ExpirationPlugin::new(
        ExpirationOptions::default()
            .max_entries(options.max_entries.unwrap_or(IMAGE_MAX_ENTRIES))
            .max_age(options.max_age.unwrap_or(IMAGE_MAX_AGE)),
        platform.clone(),
    )?;
    let strategy = Strategy::cache_first(platform)
        .cache_name(options.cache_name.unwrap_or_else(|| SmolStr::new_static(IMAGE_CACHE)))
        .plugins(options.plugins)
        .plugin(statuses_0_and_200()?)
        .plugin(expiration)
        .build();
    let matcher = options
        .matcher
        .unwrap_or_else(|| Matcher::destination(RequestDestination::Image));
    Ok(register(router, matcher, &strategy, options.warm_cache))
}

/// Stale-while-revalidate caching of scripts and styles.
pub fn static_resource_cache(
    router: &mut Router,
    platform: Platform,
    options: StaticResourceCacheOptions,
) -> Result<Recipe, ConfigError> {
    let strategy = Strategy::stale_while_revalidate(platform)
        .cache_name(
            options
                .cache_name
                .unwrap_or_else(|| SmolStr::new_static(STATIC_RESOURCE_CACHE)),
        )
        .plugins(options.plugins)
        .plugin(statuses_0_and_200()?)
        .build();
    let matcher = options.matcher.unwrap_or_else(|| {
        Matcher::when(|context| {
            matches!(
                context.request.destination(),
                RequestDestination::Script | RequestDestination::Style
            )
        })
    });
    Ok(register(router, matcher, &strategy, options.warm_cache))
}

/// Runs every URL through `strategy` and waits until each handler is done.
///
/// URLs must be absolute. The first failure is returned; the remaining
/// requests still run to completion.
pub async fn warm_strategy_cache<I>(strategy: &Strategy, urls: I) -> Result<(), StrategyError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut pending = Vec::new();
    for url in urls {
        let url = url.as_ref();
        let request = Request::get(url)
            .map_err(|error| FetchError::InvalidRequest(format!("'{url}': {error}")))?;
        let (_response, done) = strategy.handle_all(FetchEvent::new(request));
        pending.push(done);
    }

    debug!(count = pending.len(), cache = %strategy.cache_name(), "warming strategy cache");
    try_join_all(pending).await?;
    Ok(())
}
