//! Named cache storage traits.
//!
//! These mirror the platform Cache Storage API: a [`CacheStorage`] holds
//! origin-scoped, named [`Cache`]s, and each cache maps requests to
//! responses, one entry per key. Implementations are expected to serialize
//! their own writes; the engine never adds a lock on top.
//!
//! [`request_matches`] implements the query-matching rules (search, method and
//! `Vary` handling) so that every storage implementation agrees on them.

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{CacheError, Request, Response};

/// Result type of cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Options controlling how a request is matched against stored entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheQueryOptions {
    /// Ignore the query string of both URLs.
    #[serde(default)]
    pub ignore_search: bool,
    /// Match entries regardless of the request method.
    #[serde(default)]
    pub ignore_method: bool,
    /// Ignore the `Vary` header of stored responses.
    #[serde(default)]
    pub ignore_vary: bool,
}

/// [`CacheQueryOptions`] plus the cache to look in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiCacheQueryOptions {
    /// Query options applied to every consulted cache.
    pub query: CacheQueryOptions,
    /// Restrict the lookup to this cache. It is never created by a lookup.
    pub cache_name: Option<SmolStr>,
}

impl MultiCacheQueryOptions {
    /// Looks only in `cache_name`, with the given query options.
    pub fn in_cache(cache_name: impl Into<SmolStr>, query: CacheQueryOptions) -> Self {
        MultiCacheQueryOptions {
            query,
            cache_name: Some(cache_name.into()),
        }
    }
}

/// Decides whether a stored `(cached_request, cached_response)` pair answers `query`.
pub fn request_matches(
    query: &Request,
    cached_request: &Request,
    cached_response: &Response,
    options: &CacheQueryOptions,
) -> bool {
    if !options.ignore_method && query.method() != Method::GET {
        return false;
    }

    let urls_match = if options.ignore_search {
        query.url_without_search() == cached_request.url_without_search()
    } else {
        query.url() == cached_request.url()
    };
    if !urls_match {
        return false;
    }

    if options.ignore_vary {
        return true;
    }

    cached_response.vary().iter().all(|name| {
        if name == "*" {
            return false;
        }
        query.headers().get(name.as_str()) == cached_request.headers().get(name.as_str())
    })
}

/// A single named cache.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Name the cache was opened with.
    fn name(&self) -> &str;

    /// All responses whose entries match `request`, or every response when `request` is `None`.
    async fn match_all(
        &self,
        request: Option<&Request>,
        options: &CacheQueryOptions,
    ) -> CacheResult<Vec<Response>>;

    /// First response matching `request`. A miss is `Ok(None)`, never an error.
    async fn match_request(
        &self,
        request: &Request,
        options: &CacheQueryOptions,
    ) -> CacheResult<Option<Response>> {
        Ok(self
            .match_all(Some(request), options)
            .await?
            .into_iter()
            .next())
    }

    /// Stores `response` under `request`, replacing entries with the same key.
    async fn put(&self, request: Request, response: Response) -> CacheResult<()>;

    /// Deletes entries matching `request`. Returns whether anything was removed.
    async fn delete(&self, request: &Request, options: &CacheQueryOptions) -> CacheResult<bool>;

    /// Requests of all stored entries, oldest first.
    async fn keys(&self) -> CacheResult<Vec<Request>>;
}

/// Origin-scoped collection of named caches.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Opens (creating when missing) the cache called `name`.
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn Cache>>;

    /// Whether a cache called `name` exists.
    async fn has(&self, name: &str) -> CacheResult<bool>;

    /// Deletes the cache called `name`. Returns whether it existed.
    async fn delete(&self, name: &str) -> CacheResult<bool>;

    /// Names of all caches, in creation order.
    async fn keys(&self) -> CacheResult<Vec<SmolStr>>;

    /// Looks `request` up in one named cache, or in every cache in creation order.
    async fn match_request(
        &self,
        request: &Request,
        options: &MultiCacheQueryOptions,
    ) -> CacheResult<Option<Response>> {
        let names = match &options.cache_name {
            Some(name) if self.has(name).await? => vec![name.clone()],
            Some(_) => return Ok(None),
            None => self.keys().await?,
        };

        for name in names {
            let cache = self.open(&name).await?;
            if let Some(response) = cache.match_request(request, &options.query).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl<T> CacheStorage for Arc<T>
where
    T: CacheStorage + ?Sized,
{
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn Cache>> {
        (**self).open(name).await
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        (**self).has(name).await
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        (**self).delete(name).await
    }

    async fn keys(&self) -> CacheResult<Vec<SmolStr>> {
        (**self).keys().await
    }

    async fn match_request(
        &self,
        request: &Request,
        options: &MultiCacheQueryOptions,
    ) -> CacheResult<Option<Response>> {
        (**self).match_request(request, options).await
    }
}
