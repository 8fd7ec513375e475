//! Shared helpers: an in-memory cache storage and a scripted fetcher.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use http::{Method, StatusCode};
use smol_str::SmolStr;
use swkit::Platform;
use swkit_core::{
    Cache, CacheError, CacheQueryOptions, CacheResult, CacheStorage, Fetch, FetchError, FetchEvent,
    FetchOptions, FetchResult, Request, Response, request_matches,
};

/// In-memory cache holding entries in insertion order.
pub struct TestCache {
    name: SmolStr,
    entries: Mutex<Vec<(Request, Response)>>,
    puts: Arc<AtomicUsize>,
    max_entries: Option<usize>,
}

#[async_trait]
impl Cache for TestCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_all(
        &self,
        request: Option<&Request>,
        options: &CacheQueryOptions,
    ) -> CacheResult<Vec<Response>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|(cached_request, cached_response)| match request {
                Some(request) => request_matches(request, cached_request, cached_response, options),
                None => true,
            })
            .map(|(_, response)| response.clone())
            .collect())
    }

    async fn put(&self, request: Request, response: Response) -> CacheResult<()> {
        if request.method() != Method::GET {
            return Err(CacheError::NonGetRequest {
                method: request.method().clone(),
                url: request.url(),
            });
        }
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|(cached, _)| cached.url() != request.url());
        if self.max_entries.is_some_and(|max| entries.len() >= max) {
            return Err(CacheError::QuotaExceeded {
                cache: self.name.clone(),
                url: request.url(),
            });
        }
        entries.push((request, response));
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, request: &Request, options: &CacheQueryOptions) -> CacheResult<bool> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|(cached_request, cached_response)| {
            !request_matches(request, cached_request, cached_response, options)
        });
        Ok(entries.len() != before)
    }

    async fn keys(&self) -> CacheResult<Vec<Request>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect())
    }
}

/// Simple in-memory cache storage for testing using DashMap.
///
/// Clones share the same caches and counters.
#[derive(Clone, Default)]
pub struct TestStorage {
    caches: Arc<DashMap<SmolStr, Arc<TestCache>>>,
    order: Arc<Mutex<Vec<SmolStr>>>,
    puts: Arc<AtomicUsize>,
    max_entries: Option<usize>,
}

impl TestStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every cache rejects writes beyond `max_entries` with a quota error.
    pub fn with_quota(max_entries: usize) -> Self {
        TestStorage {
            max_entries: Some(max_entries),
            ..Default::default()
        }
    }

    /// Number of successful writes across all caches.
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn cache(&self, name: &str) -> Arc<TestCache> {
        let name = SmolStr::new(name);
        self.caches
            .entry(name.clone())
            .or_insert_with(|| {
                self.order.lock().unwrap().push(name.clone());
                Arc::new(TestCache {
                    name: name.clone(),
                    entries: Mutex::new(Vec::new()),
                    puts: self.puts.clone(),
                    max_entries: self.max_entries,
                })
            })
            .clone()
    }

    /// Stores an entry without counting it as a write.
    pub fn seed(&self, cache: &str, url: &str, response: Response) {
        let cache = self.cache(cache);
        let request = Request::get(url).unwrap();
        let mut entries = cache.entries.lock().unwrap();
        entries.retain(|(cached, _)| cached.url() != request.url());
        entries.push((request, response));
    }

    /// The stored response for `url`, ignoring `Vary`.
    pub fn get(&self, cache: &str, url: &str) -> Option<Response> {
        let cache = self.caches.get(cache)?.clone();
        let request = Request::get(url).unwrap();
        let entries = cache.entries.lock().unwrap();
        entries
            .iter()
            .find(|(cached, _)| cached.url() == request.url())
            .map(|(_, response)| response.clone())
    }

    /// URLs stored in `cache`, oldest first.
    pub fn urls(&self, cache: &str) -> Vec<String> {
        match self.caches.get(cache) {
            Some(cache) => cache
                .entries
                .lock()
                .unwrap()
                .iter()
                .map(|(request, _)| request.url())
                .collect(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl CacheStorage for TestStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn Cache>> {
        Ok(self.cache(name))
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        Ok(self.caches.contains_key(name))
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        self.order.lock().unwrap().retain(|existing| existing != name);
        Ok(self.caches.remove(name).is_some())
    }

    async fn keys(&self) -> CacheResult<Vec<SmolStr>> {
        Ok(self.order.lock().unwrap().clone())
    }
}

/// Scripted outcome of a fetch.
#[derive(Clone)]
pub enum Reply {
    Respond(Response),
    Delayed(Duration, Response),
    Fail(&'static str),
    DelayedFail(Duration, &'static str),
}

/// Fetcher answering from a URL → reply table and recording every call.
#[derive(Clone, Default)]
pub struct MockFetch {
    replies: Arc<DashMap<String, Reply>>,
    requests: Arc<Mutex<Vec<(Request, Option<FetchOptions>)>>>,
}

impl MockFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, url: &str, reply: Reply) -> &Self {
        self.replies.insert(Request::get(url).unwrap().url(), reply);
        self
    }

    pub fn respond(&self, url: &str, body: &'static str) -> &Self {
        self.reply(url, Reply::Respond(Response::ok(body)))
    }

    pub fn fail(&self, url: &str) -> &Self {
        self.reply(url, Reply::Fail("connection refused"))
    }

    /// Number of fetches made.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests received, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    /// Fetch options received, in order.
    pub fn options(&self) -> Vec<Option<FetchOptions>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, options)| options.clone())
            .collect()
    }
}

#[async_trait]
impl Fetch for MockFetch {
    async fn fetch(&self, request: Request, options: Option<&FetchOptions>) -> FetchResult {
        let reply = self.replies.get(&request.url()).map(|reply| reply.clone());
        self.requests.lock().unwrap().push((request, options.cloned()));

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Delayed(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Reply::Fail(message)) => Err(FetchError::network(std::io::Error::other(message))),
            Some(Reply::DelayedFail(delay, message)) => {
                tokio::time::sleep(delay).await;
                Err(FetchError::network(std::io::Error::other(message)))
            }
            None => Ok(Response::new(StatusCode::NOT_FOUND, "not found")),
        }
    }
}

pub fn platform(storage: &TestStorage, fetch: &MockFetch) -> Platform {
    Platform::new(storage.clone(), fetch.clone())
}

pub fn event(url: &str) -> FetchEvent {
    FetchEvent::new(Request::get(url).unwrap())
}

/// Lets spawned tasks that are ready to run make progress.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
