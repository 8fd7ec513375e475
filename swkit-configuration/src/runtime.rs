//! Runtime-caching entries.

use std::time::Duration;

use http::Method;
use serde::{Deserialize, Serialize};
use swkit::plugins::{
    CacheableResponse, CacheableResponseOptions, ExpirationOptions, ExpirationPlugin,
    cacheable_response_plugin,
};
use swkit::{Matcher, Platform, Route, Strategy, StrategyKind};
use swkit_core::{CacheQueryOptions, FetchOptions};
use tracing::debug;

use crate::ConfigurationError;
use crate::matcher::UrlPattern;

/// Strategy used by a runtime-caching entry.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum Handler {
    /// Cache, then network.
    CacheFirst,
    /// Cache only.
    CacheOnly,
    /// Network, then cache.
    NetworkFirst,
    /// Network only.
    NetworkOnly,
    /// Cache, revalidated from the network in the background.
    StaleWhileRevalidate,
}

impl Handler {
    fn name(self) -> &'static str {
        match self {
            Handler::CacheFirst => "CacheFirst",
            Handler::CacheOnly => "CacheOnly",
            Handler::NetworkFirst => "NetworkFirst",
            Handler::NetworkOnly => "NetworkOnly",
            Handler::StaleWhileRevalidate => "StaleWhileRevalidate",
        }
    }

    fn into_kind(self, network_timeout: Option<Duration>) -> StrategyKind {
        let network_timeout = network_timeout.filter(|timeout| !timeout.is_zero());
        match self {
            Handler::CacheFirst => StrategyKind::CacheFirst,
            Handler::CacheOnly => StrategyKind::CacheOnly,
            Handler::NetworkFirst => StrategyKind::NetworkFirst { network_timeout },
            Handler::NetworkOnly => StrategyKind::NetworkOnly { network_timeout },
            Handler::StaleWhileRevalidate => StrategyKind::StaleWhileRevalidate,
        }
    }

    fn supports_network_timeout(self) -> bool {
        matches!(self, Handler::NetworkFirst | Handler::NetworkOnly)
    }

    fn reads_cache(self) -> bool {
        !matches!(self, Handler::NetworkOnly)
    }
}

/// Options of a runtime-caching entry, including plugin shortcuts.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RuntimeOptions {
    /// Cache the strategy reads and writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_name: Option<String>,
    /// Network timeout for `NetworkFirst` and `NetworkOnly`.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub network_timeout: Option<Duration>,
    /// Adds an expiration plugin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<ExpirationOptions>,
    /// Adds a cacheable-response plugin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cacheable_response: Option<CacheableResponseOptions>,
    /// Passed to every network request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_options: Option<FetchOptions>,
    /// Used for every cache lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_options: Option<CacheQueryOptions>,
}

/// One route: which requests, which strategy, and its options.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RuntimeCaching {
    /// Requests the route applies to.
    pub url_pattern: UrlPattern,
    /// Strategy answering them.
    pub handler: Handler,
    /// HTTP method, `GET` by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Strategy options and plugin shortcuts.
    #[serde(default)]
    pub options: RuntimeOptions,
}

impl RuntimeCaching {
    /// Checks the options that only make sense together.
    ///
    /// `index` is the position of the entry, used in error messages.
    pub fn validate(&self, index: usize) -> Result<(), ConfigurationError> {
        let options = &self.options;
        if options.expiration.is_some() && options.cache_name.is_none() {
            return Err(ConfigurationError::CacheNameRequired { index });
        }

        let unsupported = |option| ConfigurationError::UnsupportedOption {
            index,
            handler: self.handler.name(),
            option,
        };
        if options.network_timeout.is_some() && !self.handler.supports_network_timeout() {
            return Err(unsupported("networkTimeout"));
        }
        if options.match_options.is_some() && !self.handler.reads_cache() {
            return Err(unsupported("matchOptions"));
        }
        Ok(())
    }

    /// Builds the strategy with its plugins.
    pub fn into_strategy(self, platform: Platform) -> Result<Strategy, ConfigurationError> {
        let options = self.options;
        let kind = self.handler.into_kind(options.network_timeout);
        let mut builder = Strategy::builder(kind, platform.clone());

        if let Some(cache_name) = options.cache_name {
            builder = builder.cache_name(cache_name);
        }
        if let Some(cacheable) = options.cacheable_response {
            builder = builder.plugin(cacheable_response_plugin(cacheable)?);
        }
        if let Some(expiration) = options.expiration {
            builder = builder.plugin(ExpirationPlugin::new(expiration, platform)?);
        }
        if let Some(fetch_options) = options.fetch_options {
            builder = builder.fetch_options(fetch_options);
        }
        if let Some(match_options) = options.match_options {
            builder = builder.match_options(match_options);
        }
        Ok(builder.build())
    }

    /// Validates the entry, its plugin options and its URL pattern.
    ///
    /// Nothing is registered yet; plugins are built by
    /// [`PreparedRoute::into_route`].
    pub fn prepare(self, index: usize, origin: &str) -> Result<PreparedRoute, ConfigurationError> {
        self.validate(index)?;

        let method = match &self.method {
            Some(method) => Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| ConfigurationError::InvalidMethod(method.clone()))?,
            None => Method::GET,
        };
        if let Some(cacheable) = &self.options.cacheable_response {
            CacheableResponse::new(cacheable.clone())?;
        }
        if let Some(expiration) = &self.options.expiration {
            expiration.validate()?;
        }
        let matcher = self.url_pattern.clone().into_matcher(origin)?;

        Ok(PreparedRoute {
            index,
            method,
            matcher,
            entry: self,
        })
    }

    /// Validates the entry and builds its route.
    pub fn into_route(
        self,
        index: usize,
        origin: &str,
        platform: Platform,
    ) -> Result<Route, ConfigurationError> {
        self.prepare(index, origin)?.into_route(platform)
    }
}

/// A validated entry with its matcher, waiting for its strategy.
pub struct PreparedRoute {
    index: usize,
    method: Method,
    matcher: Matcher,
    entry: RuntimeCaching,
}

impl PreparedRoute {
    /// Builds the strategy with its plugins and wraps it in a route.
    pub fn into_route(self, platform: Platform) -> Result<Route, ConfigurationError> {
        let handler = self.entry.handler;
        let strategy = self.entry.into_strategy(platform)?;

        debug!(
            index = self.index,
            handler = handler.name(),
            method = %self.method,
            cache = %strategy.cache_name(),
            "registering runtime caching route"
        );
        Ok(Route::new(self.matcher, strategy).with_method(self.method))
    }
}
