use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use swkit_core::{CacheQueryOptions, Request, Response};
use tracing::debug;

use crate::error::{ConfigError, PluginError};
use crate::platform::Platform;
use crate::plugin::{Plugin, PluginResult};
use crate::quota;

/// Limits applied to the caches an [`ExpirationPlugin`] is attached to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirationOptions {
    /// Maximum number of entries kept per cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
    /// Maximum age of an entry.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub max_age: Option<Duration>,
    /// Delete the caches when a write exceeds the storage quota.
    #[serde(default)]
    pub purge_on_quota_error: bool,
    /// Options used when deleting expired entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_options: Option<CacheQueryOptions>,
}

impl ExpirationOptions {
    /// Keeps at most `max_entries` entries per cache.
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Expires entries older than `max_age`.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Deletes the caches on quota errors.
    pub fn purge_on_quota_error(mut self, purge: bool) -> Self {
        self.purge_on_quota_error = purge;
        self
    }

    /// Fails when neither `max_entries` nor `max_age` is set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries.is_none() && self.max_age.is_none() {
            return Err(ConfigError::InvalidPluginOptions(
                "max-entries-or-age-required: expiration needs maxEntries or maxAge",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    request: Request,
    timestamp: DateTime<Utc>,
    sequence: u64,
}

/// Entry timestamps of one cache, used to expire its entries.
#[derive(Debug)]
pub struct CacheExpiration {
    cache_name: SmolStr,
    max_entries: Option<usize>,
    max_age: Option<Duration>,
    match_options: CacheQueryOptions,
    entries: DashMap<String, Entry>,
    sequence: AtomicU64,
}

impl CacheExpiration {
    fn new(cache_name: SmolStr, options: &ExpirationOptions) -> Self {
        CacheExpiration {
            cache_name,
            max_entries: options.max_entries,
            max_age: options.max_age,
            match_options: options.match_options.unwrap_or_default(),
            entries: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Name of the tracked cache.
    pub fn cache_name(&self) -> &SmolStr {
        &self.cache_name
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no entry is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records that `request` was written or used now.
    pub fn update_timestamp(&self, request: &Request) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            request.url(),
            Entry {
                request: request.clone(),
                timestamp: Utc::now(),
                sequence,
            },
        );
    }

    /// URLs to expire: entries beyond `max_entries` (least recently updated
    /// first) and entries older than `max_age`.
    fn expired(&self) -> Vec<Entry> {
        let mut entries: Vec<Entry> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by(|a, b| (b.timestamp, b.sequence).cmp(&(a.timestamp, a.sequence)));

        let oldest_allowed = self
            .max_age
            .and_then(|max_age| chrono::Duration::from_std(max_age).ok())
            .map(|max_age| Utc::now() - max_age);

        entries
            .into_iter()
            .enumerate()
            .filter(|(index, entry)| {
                let over_limit = self.max_entries.is_some_and(|max| *index >= max);
                let too_old = oldest_allowed.is_some_and(|oldest| entry.timestamp < oldest);
                over_limit || too_old
            })
            .map(|(_, entry)| entry)
            .collect()
    }

    /// Deletes expired entries from the cache. Returns how many were removed
    /// from tracking.
    pub async fn expire_entries(&self, platform: &Platform) -> PluginResult<usize> {
        let expired = self.expired();
        if expired.is_empty() {
            return Ok(0);
        }

        let cache = platform.caches().open(&self.cache_name).await?;
        for entry in &expired {
            self.entries.remove(&entry.request.url());
            cache.delete(&entry.request, &self.match_options).await?;
        }
        debug!(
            cache = %self.cache_name,
            count = expired.len(),
            "expired cache entries"
        );
        Ok(expired.len())
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

#[derive(Debug)]
struct ExpirationInner {
    options: ExpirationOptions,
    platform: Platform,
    caches: DashMap<SmolStr, Arc<CacheExpiration>>,
}

impl ExpirationInner {
    fn expiration(&self, cache_name: &SmolStr) -> Arc<CacheExpiration> {
        self.caches
            .entry(cache_name.clone())
            .or_insert_with(|| Arc::new(CacheExpiration::new(cache_name.clone(), &self.options)))
            .clone()
    }

    fn is_fresh(&self, response: &Response) -> bool {
        let Some(max_age) = self.options.max_age else {
            return true;
        };
        let Some(date) = response.date() else {
            return true;
        };
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => date >= Utc::now() - max_age,
            Err(_) => true,
        }
    }

    async fn purge(&self) -> PluginResult<()> {
        let names: Vec<SmolStr> = self.caches.iter().map(|entry| entry.key().clone()).collect();
        for name in names {
            debug!(cache = %name, "deleting cache after a quota error");
            self.platform.caches().delete(&name).await?;
            if let Some(expiration) = self.caches.get(&name).map(|entry| entry.value().clone()) {
                expiration.clear();
            }
        }
        Ok(())
    }
}

/// Expires entries of the caches it is attached to by count and age.
///
/// - `cachedResponseWillBeUsed` rejects responses whose `Date` header is older
///   than `max_age`, refreshes the entry's timestamp and expires old entries
///   in the background.
/// - `cacheDidUpdate` records the write and expires entries beyond the limits.
///
/// With `purge_on_quota_error`, a quota callback deleting every cache the
/// plugin has seen is registered on construction.
#[derive(Debug, Clone)]
pub struct ExpirationPlugin {
    inner: Arc<ExpirationInner>,
}

impl ExpirationPlugin {
    /// Fails when neither `max_entries` nor `max_age` is set.
    ///
    /// With `purge_on_quota_error`, registers a process-wide quota callback.
    pub fn new(options: ExpirationOptions, platform: Platform) -> Result<Self, ConfigError> {
        options.validate()?;

        let plugin = ExpirationPlugin {
            inner: Arc::new(ExpirationInner {
                options,
                platform,
                caches: DashMap::new(),
            }),
        };

        if plugin.inner.options.purge_on_quota_error {
            let inner = plugin.inner.clone();
            quota::register_quota_error_callback(move || {
                let inner = inner.clone();
                async move { inner.purge().await }
            });
        }
        Ok(plugin)
    }

    /// Expiration state of `cache_name`.
    pub fn cache_expiration(&self, cache_name: &str) -> Arc<CacheExpiration> {
        self.inner.expiration(&SmolStr::new(cache_name))
    }

    /// Deletes every cache the plugin has seen, with its tracking data.
    pub async fn delete_cache_and_metadata(&self) -> Result<(), PluginError> {
        self.inner.purge().await
    }

    /// The plugin's lifecycle callbacks.
    pub fn plugin(&self) -> Plugin {
        let used = self.inner.clone();
        let updated = self.inner.clone();

        Plugin::builder("expiration")
            .cached_response_will_be_used(move |params| {
                let inner = used.clone();
                async move {
                    let Some(cached) = params.cached_response else {
                        return Ok(None);
                    };
                    let fresh = inner.is_fresh(&cached);
                    let expiration = inner.expiration(&params.cache_name);
                    expiration.update_timestamp(&params.request);

                    let platform = inner.platform.clone();
                    params.event.wait_until(async move {
                        expiration.expire_entries(&platform).await.map(drop)
                    });

                    if !fresh {
                        debug!(
                            url = %params.request.url(),
                            "cached response is older than max age"
                        );
                    }
                    Ok(fresh.then_some(cached))
                }
            })
            .cache_did_update(move |params| {
                let inner = updated.clone();
                async move {
                    let expiration = inner.expiration(&params.cache_name);
                    expiration.update_timestamp(&params.request);
                    expiration.expire_entries(&inner.platform).await.map(drop)
                }
            })
            .build()
    }
}

impl From<ExpirationPlugin> for Plugin {
    fn from(expiration: ExpirationPlugin) -> Self {
        expiration.plugin()
    }
}
