//! Moka-backed cache storage.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use http::{HeaderMap, Method};
use moka::future::Cache as MokaStore;
use moka::policy::EvictionPolicy;
use smol_str::SmolStr;
use swkit_core::{
    Cache, CacheError, CacheQueryOptions, CacheResult, CacheStorage, Request, Response,
    request_matches,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::builder::{MokaCacheStorageBuilder, NoCapacity};
use crate::metrics;

/// Fixed estimate for the bookkeeping of one stored entry.
const ENTRY_OVERHEAD: u64 = 112;

#[derive(Debug, Clone)]
struct Stored {
    request: Request,
    response: Response,
    sequence: u64,
    size: u64,
}

/// Entries sharing a URL without its query string.
type Bucket = Arc<Vec<Stored>>;

fn bucket_key(request: &Request) -> String {
    request.url_without_search()
}

fn headers_size(headers: &HeaderMap) -> usize {
    headers
        .iter()
        .map(|(name, value)| name.as_str().len() + value.len())
        .sum()
}

fn entry_size(request: &Request, response: &Response) -> u64 {
    let bytes = request.url().len()
        + headers_size(request.headers())
        + response.body().len()
        + headers_size(response.headers());
    bytes as u64 + ENTRY_OVERHEAD
}

/// Storage-wide byte budget.
#[derive(Debug)]
pub(crate) struct Quota {
    limit: u64,
    used: AtomicU64,
}

impl Quota {
    pub(crate) fn new(limit: u64) -> Self {
        Quota {
            limit,
            used: AtomicU64::new(0),
        }
    }

    /// Charges `add` bytes after releasing `release`, unless the limit would be exceeded.
    fn charge(&self, add: u64, release: u64) -> bool {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                let next = used.saturating_sub(release) + add;
                (next <= self.limit).then_some(next)
            })
            .is_ok()
    }

    fn release(&self, bytes: u64) {
        let _ = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                Some(used.saturating_sub(bytes))
            });
    }

    fn used(&self) -> u64 {
        self.used.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Limit {
    Entries(u64),
    Bytes(Arc<Quota>),
}

/// A single named cache held in memory.
///
/// Entries are grouped by URL without its query string, so a lookup touches
/// one Moka entry whatever its [`CacheQueryOptions`]. Writes to the same cache
/// are serialized.
pub struct MokaCache {
    name: SmolStr,
    storage: SmolStr,
    created: u64,
    store: MokaStore<String, Bucket>,
    quota: Option<Arc<Quota>>,
    bytes: AtomicU64,
    sequence: AtomicU64,
    writes: Mutex<()>,
}

impl std::fmt::Debug for MokaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCache")
            .field("name", &self.name)
            .field("storage", &self.storage)
            .field("entry_count", &self.store.entry_count())
            .finish()
    }
}

impl MokaCache {
    fn new(
        name: SmolStr,
        storage: SmolStr,
        created: u64,
        limit: &Limit,
        eviction_policy: Option<EvictionPolicy>,
    ) -> Self {
        let (store, quota) = match limit {
            Limit::Entries(max) => {
                let store = MokaStore::builder()
                    .max_capacity(*max)
                    .weigher(|_url: &String, bucket: &Bucket| {
                        bucket.len().min(u32::MAX as usize) as u32
                    })
                    .eviction_policy(eviction_policy.unwrap_or_else(EvictionPolicy::lru))
                    .build();
                (store, None)
            }
            Limit::Bytes(quota) => (MokaStore::builder().build(), Some(quota.clone())),
        };

        MokaCache {
            name,
            storage,
            created,
            store,
            quota,
            bytes: AtomicU64::new(0),
            sequence: AtomicU64::new(0),
            writes: Mutex::new(()),
        }
    }

    /// Approximate number of distinct URLs (ignoring query strings) held.
    pub fn entry_count(&self) -> u64 {
        self.store.entry_count()
    }

    /// Runs Moka's pending maintenance, applying evictions right away.
    pub async fn run_pending_tasks(&self) {
        self.store.run_pending_tasks().await;
    }

    fn stored(&self) -> Vec<Stored> {
        let mut stored: Vec<Stored> = self
            .store
            .iter()
            .flat_map(|(_, bucket)| bucket.iter().cloned().collect::<Vec<_>>())
            .collect();
        stored.sort_by_key(|entry| entry.sequence);
        stored
    }

    fn release(&self, bytes: u64) {
        let _ = self
            .bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                Some(used.saturating_sub(bytes))
            });
        if let Some(quota) = &self.quota {
            quota.release(bytes);
        }
    }

    fn purge(&self) {
        if let Some(quota) = &self.quota {
            quota.release(self.bytes.swap(0, Ordering::AcqRel));
        }
        self.store.invalidate_all();
    }

    fn record(&self) {
        let used = self.quota.as_ref().map(|quota| quota.used()).unwrap_or(0);
        metrics::record_capacity(&self.storage, &self.name, self.store.entry_count(), used);
    }
}

#[async_trait]
impl Cache for MokaCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_all(
        &self,
        request: Option<&Request>,
        options: &CacheQueryOptions,
    ) -> CacheResult<Vec<Response>> {
        let Some(request) = request else {
            return Ok(self.stored().into_iter().map(|entry| entry.response).collect());
        };

        let mut matched: Vec<Stored> = match self.store.get(&bucket_key(request)).await {
            Some(bucket) => bucket
                .iter()
                .filter(|entry| request_matches(request, &entry.request, &entry.response, options))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        matched.sort_by_key(|entry| entry.sequence);
        Ok(matched.into_iter().map(|entry| entry.response).collect())
    }

    async fn put(&self, request: Request, response: Response) -> CacheResult<()> {
        if request.method() != Method::GET {
            return Err(CacheError::NonGetRequest {
                method: request.method().clone(),
                url: request.url(),
            });
        }

        let key = bucket_key(&request);
        let _writes = self.writes.lock().await;
        let bucket = self.store.get(&key).await.unwrap_or_default();
        let (replaced, mut kept): (Vec<Stored>, Vec<Stored>) =
            bucket.iter().cloned().partition(|entry| {
                request_matches(
                    &request,
                    &entry.request,
                    &entry.response,
                    &CacheQueryOptions::default(),
                )
            });

        let size = entry_size(&request, &response);
        let released: u64 = replaced.iter().map(|entry| entry.size).sum();
        if let Some(quota) = &self.quota
            && !quota.charge(size, released)
        {
            debug!(cache = %self.name, url = %request.url(), size, "storage quota exceeded");
            return Err(CacheError::QuotaExceeded {
                cache: self.name.clone(),
                url: request.url(),
            });
        }
        let _ = self
            .bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                Some(used.saturating_sub(released) + size)
            });

        kept.push(Stored {
            request,
            response,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            size,
        });
        self.store.insert(key, Arc::new(kept)).await;
        self.record();
        Ok(())
    }

    async fn delete(&self, request: &Request, options: &CacheQueryOptions) -> CacheResult<bool> {
        let key = bucket_key(request);
        let _writes = self.writes.lock().await;
        let Some(bucket) = self.store.get(&key).await else {
            return Ok(false);
        };

        let (removed, kept): (Vec<Stored>, Vec<Stored>) = bucket
            .iter()
            .cloned()
            .partition(|entry| request_matches(request, &entry.request, &entry.response, options));
        if removed.is_empty() {
            return Ok(false);
        }

        self.release(removed.iter().map(|entry| entry.size).sum());
        if kept.is_empty() {
            self.store.invalidate(&key).await;
        } else {
            self.store.insert(key, Arc::new(kept)).await;
        }
        self.record();
        Ok(true)
    }

    async fn keys(&self) -> CacheResult<Vec<Request>> {
        Ok(self.stored().into_iter().map(|entry| entry.request).collect())
    }
}

struct StorageInner {
    label: SmolStr,
    limit: Limit,
    eviction_policy: Option<EvictionPolicy>,
    caches: DashMap<SmolStr, Arc<MokaCache>>,
    created: AtomicU64,
}

/// In-memory [`CacheStorage`] powered by Moka.
///
/// Clones share the same caches.
///
/// # Examples
///
/// ```
/// use swkit_moka::MokaCacheStorage;
///
/// // Every cache keeps at most 500 URLs.
/// let storage = MokaCacheStorage::builder().max_entries(500).build();
///
/// // All caches together may hold 10 MB; larger writes fail with a quota error.
/// let storage = MokaCacheStorage::builder()
///     .label("runtime")
///     .max_bytes(10 * 1024 * 1024)
///     .build();
/// ```
///
/// # Caveats
///
/// - Data is **not persisted**; caches are lost on process restart
/// - With [`max_entries`](MokaCacheStorageBuilder::max_entries), eviction is
///   best-effort and applied by Moka's maintenance tasks
#[derive(Clone)]
pub struct MokaCacheStorage {
    inner: Arc<StorageInner>,
}

impl std::fmt::Debug for MokaCacheStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacheStorage")
            .field("label", &self.inner.label)
            .field("limit", &self.inner.limit)
            .field("caches", &self.inner.caches.len())
            .finish()
    }
}

impl MokaCacheStorage {
    /// Creates a builder with no capacity configured.
    pub fn builder() -> MokaCacheStorageBuilder<NoCapacity> {
        MokaCacheStorageBuilder::new()
    }

    pub(crate) fn new(
        label: SmolStr,
        limit: Limit,
        eviction_policy: Option<EvictionPolicy>,
    ) -> Self {
        MokaCacheStorage {
            inner: Arc::new(StorageInner {
                label,
                limit,
                eviction_policy,
                caches: DashMap::new(),
                created: AtomicU64::new(0),
            }),
        }
    }

    /// Label identifying this storage in metrics and logs.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Bytes charged against the quota, when a byte budget is configured.
    pub fn used_bytes(&self) -> Option<u64> {
        match &self.inner.limit {
            Limit::Bytes(quota) => Some(quota.used()),
            Limit::Entries(_) => None,
        }
    }

    /// The cache called `name`, if it has been opened.
    pub fn cache(&self, name: &str) -> Option<Arc<MokaCache>> {
        self.inner.caches.get(name).map(|cache| cache.clone())
    }
}

#[async_trait]
impl CacheStorage for MokaCacheStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn Cache>> {
        let inner = &self.inner;
        let cache: Arc<dyn Cache> = inner
            .caches
            .entry(SmolStr::new(name))
            .or_insert_with(|| {
                debug!(storage = %inner.label, cache = name, "creating moka cache");
                Arc::new(MokaCache::new(
                    SmolStr::new(name),
                    inner.label.clone(),
                    inner.created.fetch_add(1, Ordering::Relaxed),
                    &inner.limit,
                    inner.eviction_policy.clone(),
                ))
            })
            .clone();
        Ok(cache)
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        Ok(self.inner.caches.contains_key(name))
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        match self.inner.caches.remove(name) {
            Some((_, cache)) => {
                cache.purge();
                debug!(storage = %self.inner.label, cache = name, "deleted moka cache");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn keys(&self) -> CacheResult<Vec<SmolStr>> {
        let mut names: Vec<(u64, SmolStr)> = self
            .inner
            .caches
            .iter()
            .map(|entry| (entry.created, entry.key().clone()))
            .collect();
        names.sort_by_key(|(created, _)| *created);
        Ok(names.into_iter().map(|(_, name)| name).collect())
    }
}
