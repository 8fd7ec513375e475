//! Error types raised by the platform primitives.
//!
//! Both enums are `Clone` so that a failure can be handed to several
//! observers (lifecycle callbacks, the caller and the extended-lifetime join)
//! without re-creating it.

use std::sync::Arc;
use std::time::Duration;

use http::Method;
use smol_str::SmolStr;
use thiserror::Error;

/// Boxed error used at the seams where callers supply their own error types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared, cloneable error source.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Error returned by [`Cache`](crate::Cache) and
/// [`CacheStorage`](crate::CacheStorage) operations.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The storage budget would be exceeded by this write.
    #[error("quota exceeded while writing '{url}' into cache '{cache}'")]
    QuotaExceeded {
        /// Name of the cache that rejected the write.
        cache: SmolStr,
        /// URL of the request being written.
        url: String,
    },

    /// Only `GET` requests can be used as cache keys.
    #[error("unable to cache '{url}': only GET requests can be cached, got {method}")]
    NonGetRequest {
        /// Method of the rejected request.
        method: Method,
        /// URL of the rejected request.
        url: String,
    },

    /// Any other storage failure.
    #[error("cache storage error: {0}")]
    Storage(SharedError),
}

impl CacheError {
    /// Wraps an arbitrary error as a storage failure.
    pub fn storage(error: impl Into<BoxError>) -> Self {
        CacheError::Storage(Arc::from(error.into()))
    }

    /// Returns `true` for quota errors, which trigger the registered quota callbacks.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, CacheError::QuotaExceeded { .. })
    }
}

/// Error returned by [`Fetch`](crate::Fetch) implementations.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, connection, TLS...).
    #[error("network error: {0}")]
    Network(SharedError),

    /// No response was produced within the given duration.
    #[error("timed out the network response after {0:?}")]
    Timeout(Duration),

    /// The request could not be converted for the transport.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Wraps an arbitrary error as a network failure.
    pub fn network(error: impl Into<BoxError>) -> Self {
        FetchError::Network(Arc::from(error.into()))
    }
}
