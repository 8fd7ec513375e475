#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Cache name construction.
///
/// Names are built as `prefix-role-suffix` from process-wide details
/// (`workbox`, `precache-v2`/`runtime`/`googleAnalytics`, the worker scope),
/// with empty components dropped.
pub mod cache_names;

/// Error types of the engine.
///
/// - [`StrategyError`] for everything that can go wrong while handling a request
/// - [`PluginError`] raised by plugin callbacks
/// - [`ConfigError`] for invalid cache-name or plugin configuration
/// - [`RouteError`](error::RouteError) for invalid route patterns
pub mod error;

/// Metrics collection.
///
/// When the `metrics` feature is enabled, this module reports counters for
/// cache hits and misses, network fetches, cache writes and quota errors, and
/// a histogram of handler durations.
pub mod metrics;

mod platform;

pub mod plugin;
pub mod plugins;

/// Quota-error callbacks run when a cache write exceeds the storage quota.
pub mod quota;

pub mod recipes;
pub mod routing;
pub mod strategy;

pub use error::{ConfigError, PluginError, StrategyError};
pub use platform::Platform;
pub use plugin::{LifecyclePoint, Plugin, PluginBuilder};
pub use routing::{HandlerOptions, Matcher, Route, RouteHandler, Router};
pub use strategy::{
    DoneFuture, ResponseFuture, Strategy, StrategyBuilder, StrategyHandler, StrategyKind,
};

pub use swkit_core::{
    Cache, CacheError, CacheQueryOptions, CacheStorage, Fetch, FetchError, FetchEvent,
    FetchOptions, Request, RequestDestination, RequestMode, Response, ResponseType,
};
