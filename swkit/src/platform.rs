use std::fmt;
use std::sync::Arc;

use swkit_core::{CacheStorage, Fetch};

/// The cache storage and fetcher strategies run against.
#[derive(Clone)]
pub struct Platform {
    caches: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetch>,
}

impl Platform {
    /// Creates a platform from a storage and a fetcher.
    pub fn new(caches: impl CacheStorage + 'static, fetcher: impl Fetch + 'static) -> Self {
        Platform {
            caches: Arc::new(caches),
            fetcher: Arc::new(fetcher),
        }
    }

    /// Creates a platform from already shared parts.
    pub fn from_shared(caches: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetch>) -> Self {
        Platform { caches, fetcher }
    }

    /// The cache storage.
    pub fn caches(&self) -> &Arc<dyn CacheStorage> {
        &self.caches
    }

    /// The fetcher.
    pub fn fetcher(&self) -> &Arc<dyn Fetch> {
        &self.fetcher
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}
