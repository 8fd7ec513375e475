//! Error types of the strategy engine.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;
use swkit_core::{BoxError, CacheError, FetchError, SharedError};
use thiserror::Error;
use tokio::task::JoinError;

use crate::plugin::LifecyclePoint;

/// Error raised by a plugin callback.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// A plain failure message.
    #[error("{0}")]
    Message(SmolStr),
    /// An error produced by code the plugin called into.
    #[error(transparent)]
    Other(SharedError),
}

impl PluginError {
    /// Creates an error from a message.
    pub fn msg(message: impl Into<SmolStr>) -> Self {
        PluginError::Message(message.into())
    }

    /// Wraps an arbitrary error.
    pub fn new(error: impl Into<BoxError>) -> Self {
        PluginError::Other(Arc::from(error.into()))
    }
}

impl From<CacheError> for PluginError {
    fn from(error: CacheError) -> Self {
        PluginError::new(error)
    }
}

/// Error produced while a strategy handles a request.
///
/// Cloneable so that one failure can be reported to the caller, to
/// `handlerDidError`/`handlerDidComplete` callbacks and to the event lifetime.
#[derive(Debug, Clone, Error)]
pub enum StrategyError {
    /// Neither the cache nor the network produced a usable response.
    #[error(
        "no-response: the strategy could not generate a response for '{url}'{}",
        DisplaySource(.source)
    )]
    NoResponse {
        /// URL of the request.
        url: String,
        /// The failure that led here, if there was one.
        #[source]
        source: Option<Box<StrategyError>>,
    },

    /// The fetcher failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The cache storage failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A `requestWillFetch` callback rejected the request.
    #[error("plugin-error-request-will-fetch: {message}")]
    RequestWillFetch {
        /// Message of the rejecting plugin.
        message: String,
    },

    /// A plugin callback failed.
    #[error("plugin failed during {point}: {source}")]
    Plugin {
        /// Lifecycle point the failing callback was registered for.
        point: LifecyclePoint,
        /// The plugin's error.
        source: PluginError,
    },

    /// A quota-error callback failed.
    #[error("quota error callback failed: {0}")]
    QuotaCallback(PluginError),

    /// A spawned task panicked or was cancelled.
    #[error("strategy task failed: {0}")]
    Task(SmolStr),
}

impl StrategyError {
    /// Builds a no-response error for `url`, attaching `source` when present.
    pub fn no_response(url: impl Into<String>, source: Option<StrategyError>) -> Self {
        StrategyError::NoResponse {
            url: url.into(),
            source: source.map(Box::new),
        }
    }

    pub(crate) fn plugin(point: LifecyclePoint) -> impl FnOnce(PluginError) -> StrategyError {
        move |source| StrategyError::Plugin { point, source }
    }

    /// `true` for [`StrategyError::NoResponse`].
    pub fn is_no_response(&self) -> bool {
        matches!(self, StrategyError::NoResponse { .. })
    }
}

impl From<JoinError> for StrategyError {
    fn from(error: JoinError) -> Self {
        let reason = if error.is_cancelled() {
            "cancelled"
        } else {
            "panicked"
        };
        StrategyError::Task(SmolStr::new(reason))
    }
}

struct DisplaySource<'a>(&'a Option<Box<StrategyError>>);

impl fmt::Display for DisplaySource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(source) => write!(f, " ({source})"),
            None => Ok(()),
        }
    }
}

/// Invalid cache-name configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A cache-name component that must not be empty was set to an empty string.
    #[error("invalid-cache-name: '{0}' must be a non-empty string")]
    EmptyCacheName(&'static str),

    /// A bundled plugin was configured without any criteria.
    #[error("{0}")]
    InvalidPluginOptions(&'static str),
}

/// Error raised while building routes.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The URL pattern is not a valid regular expression.
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Parser error.
        source: regex::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_response_mentions_url_and_cause() {
        let error = StrategyError::no_response(
            "https://example.com/a",
            Some(FetchError::network(std::io::Error::other("offline")).into()),
        );
        assert_eq!(
            error.to_string(),
            "no-response: the strategy could not generate a response for \
             'https://example.com/a' (network error: offline)"
        );
        assert!(error.is_no_response());
    }
}
