//! Plugin lifecycle callbacks as seen from a running strategy.

mod common;

use std::sync::{Arc, Mutex};

use common::{MockFetch, TestStorage, event, platform};
use futures::future::{Ready, ready};
use http::header::{HeaderName, HeaderValue};
use http::{Method, Uri};
use swkit::plugin::{
    CacheDidUpdateParams, CacheKeyMode, CacheKeyWillBeUsedParams, CacheWillUpdateParams,
    CachedResponseWillBeUsedParams, FetchDidSucceedParams, HandlerDidCompleteParams,
    HandlerDidRespondParams, HandlerWillRespondParams, HandlerWillStartParams, PluginResult,
    RequestWillFetchParams,
};
use swkit::{CacheError, FetchOptions, Plugin, PluginError, Strategy, StrategyError};
use swkit_core::{FetchEvent, Request, Response};

const URL: &str = "https://app.test/page";

#[derive(Clone, Default)]
struct Log(Arc<Mutex<Vec<&'static str>>>);

impl Log {
    fn record<P, T>(
        &self,
        point: &'static str,
        output: impl Fn(P) -> T + Send + Sync + 'static,
    ) -> impl Fn(P) -> Ready<PluginResult<T>> + Send + Sync + 'static
    where
        P: 'static,
        T: Send + 'static,
    {
        let log = self.clone();
        move |params| {
            log.0.lock().unwrap().push(point);
            ready(Ok(output(params)))
        }
    }

    fn entries(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }

    fn position(&self, point: &str) -> usize {
        self.entries()
            .iter()
            .position(|entry| *entry == point)
            .unwrap_or_else(|| panic!("{point} was not called"))
    }
}

fn recorder(log: &Log) -> Plugin {
    Plugin::builder("recorder")
        .handler_will_start(log.record("handlerWillStart", |_: HandlerWillStartParams| ()))
        .cache_key_will_be_used(log.record(
            "cacheKeyWillBeUsed",
            |p: CacheKeyWillBeUsedParams| p.request,
        ))
        .cached_response_will_be_used(log.record(
            "cachedResponseWillBeUsed",
            |p: CachedResponseWillBeUsedParams| p.cached_response,
        ))
        .request_will_fetch(log.record("requestWillFetch", |p: RequestWillFetchParams| p.request))
        .fetch_did_succeed(log.record("fetchDidSucceed", |p: FetchDidSucceedParams| p.response))
        .cache_will_update(log.record(
            "cacheWillUpdate",
            |p: CacheWillUpdateParams| Some(p.response),
        ))
        .cache_did_update(log.record("cacheDidUpdate", |_: CacheDidUpdateParams| ()))
        .handler_will_respond(log.record(
            "handlerWillRespond",
            |p: HandlerWillRespondParams| p.response,
        ))
        .handler_did_respond(log.record("handlerDidRespond", |_: HandlerDidRespondParams| ()))
        .handler_did_complete(log.record("handlerDidComplete", |_: HandlerDidCompleteParams| ()))
        .build()
}

/// Test 1: Callbacks run in lifecycle order around a cache miss
#[tokio::test]
async fn test_lifecycle_order_on_cache_miss() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "fresh");
    let log = Log::default();

    let strategy = Strategy::cache_first(platform(&storage, &fetch))
        .cache_name("pages")
        .plugin(recorder(&log))
        .build();
    let (response, done) = strategy.handle_all(event(URL));
    response.await.unwrap();
    done.await.unwrap();

    let entries = log.entries();
    assert_eq!(entries.first(), Some(&"handlerWillStart"));
    assert_eq!(entries.last(), Some(&"handlerDidComplete"));
    assert!(log.position("cacheKeyWillBeUsed") < log.position("cachedResponseWillBeUsed"));
    assert!(log.position("cachedResponseWillBeUsed") < log.position("requestWillFetch"));
    assert!(log.position("requestWillFetch") < log.position("fetchDidSucceed"));
    assert!(log.position("fetchDidSucceed") < log.position("handlerWillRespond"));
    assert!(log.position("handlerWillRespond") < log.position("handlerDidRespond"));
    assert!(log.position("cacheWillUpdate") < log.position("cacheDidUpdate"));
    assert_eq!(entries.iter().filter(|entry| **entry == "cacheKeyWillBeUsed").count(), 2);
}

/// Test 2: cacheKeyWillBeUsed changes the key used for reads and writes, not the fetched URL
#[tokio::test]
async fn test_cache_key_rewrites_storage_key() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond("https://app.test/page?utm=1", "fresh");
    let modes = Arc::new(Mutex::new(Vec::new()));

    let seen = modes.clone();
    let strip_query = Plugin::builder("strip-query")
        .cache_key_will_be_used(move |params| {
            seen.lock().unwrap().push(params.mode);
            let uri: Uri = params.request.url_without_search().parse().unwrap();
            async move { Ok(params.request.with_uri(uri)) }
        })
        .build();

    let strategy = Strategy::cache_first(platform(&storage, &fetch))
        .cache_name("pages")
        .plugin(strip_query)
        .build();
    let (response, done) = strategy.handle_all(event("https://app.test/page?utm=1"));
    assert_eq!(response.await.unwrap().text(), "fresh");
    done.await.unwrap();

    assert_eq!(fetch.requests()[0].url(), "https://app.test/page?utm=1");
    assert_eq!(storage.urls("pages"), vec![URL.to_string()]);
    assert_eq!(*modes.lock().unwrap(), vec![CacheKeyMode::Read, CacheKeyMode::Write]);

    let cached = strategy.handle(event("https://app.test/page?utm=2")).await.unwrap();
    assert_eq!(cached.text(), "fresh");
    assert_eq!(fetch.calls(), 1);
}

/// Test 3: A failing requestWillFetch aborts the fetch with its message
#[tokio::test]
async fn test_request_will_fetch_failure() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "fresh");

    let block = Plugin::builder("block")
        .request_will_fetch(|_| async { Err(PluginError::msg("blocked by policy")) })
        .build();
    let strategy = Strategy::network_only(platform(&storage, &fetch))
        .plugin(block)
        .build();

    let error = strategy.handle(event(URL)).await.unwrap_err();
    assert!(
        error
            .to_string()
            .ends_with("(plugin-error-request-will-fetch: blocked by policy)")
    );
    assert_eq!(fetch.calls(), 0);
}

/// Test 4: fetchDidFail sees the request before and after requestWillFetch
#[tokio::test]
async fn test_fetch_did_fail_receives_original_and_filtered_request() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.fail(URL);
    let seen = Arc::new(Mutex::new(None));

    let captured = seen.clone();
    let plugin = Plugin::builder("tag")
        .request_will_fetch(|params| async move {
            Ok(params.request.with_header(
                HeaderName::from_static("x-tag"),
                HeaderValue::from_static("filtered"),
            ))
        })
        .fetch_did_fail(move |params| {
            *captured.lock().unwrap() = Some((
                params.original_request.header("x-tag").map(str::to_owned),
                params.request.header("x-tag").map(str::to_owned),
                params.error.to_string(),
            ));
            async { Ok(()) }
        })
        .build();

    let strategy = Strategy::network_only(platform(&storage, &fetch))
        .plugin(plugin)
        .build();
    strategy.handle(event(URL)).await.unwrap_err();

    let (original, filtered, error) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(original, None);
    assert_eq!(filtered.as_deref(), Some("filtered"));
    assert!(error.contains("connection refused"));
}

/// Test 5: handlerDidError supplies a fallback that handlerWillRespond can still change
#[tokio::test]
async fn test_handler_did_error_fallback() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    let errors = Arc::new(Mutex::new(Vec::new()));

    let seen = errors.clone();
    let offline = Plugin::builder("offline")
        .handler_did_error(move |params| {
            seen.lock().unwrap().push(params.error.is_no_response());
            async { Ok(Some(Response::ok("offline page"))) }
        })
        .handler_will_respond(|params| async move {
            Ok(params.response.with_header(
                HeaderName::from_static("x-fallback"),
                HeaderValue::from_static("1"),
            ))
        })
        .build();
    let second = Plugin::builder("second")
        .handler_did_error(|_| async { Ok(Some(Response::ok("ignored"))) })
        .build();

    let strategy = Strategy::cache_only(platform(&storage, &fetch))
        .plugins([offline, second])
        .build();
    let response = strategy.handle(event(URL)).await.unwrap();

    assert_eq!(response.text(), "offline page");
    assert_eq!(response.header("x-fallback"), Some("1"));
    assert_eq!(*errors.lock().unwrap(), vec![true]);
}

/// Test 6: A failing handlerWillStart is recovered like any strategy failure
#[tokio::test]
async fn test_handler_will_start_failure_is_recoverable() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();

    let plugin = Plugin::builder("guard")
        .handler_will_start(|_| async { Err(PluginError::msg("not today")) })
        .handler_did_error(|params| async move {
            let recoverable = matches!(params.error, StrategyError::Plugin { .. });
            Ok(recoverable.then(|| Response::ok("recovered")))
        })
        .build();
    let strategy = Strategy::network_only(platform(&storage, &fetch))
        .plugin(plugin)
        .build();

    assert_eq!(strategy.handle(event(URL)).await.unwrap().text(), "recovered");
    assert_eq!(fetch.calls(), 0);
}

/// Test 7: A failed background write fails the done future but not the response
#[tokio::test]
async fn test_failed_cache_write_reaches_handler_did_complete() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "fresh");
    let completed = Arc::new(Mutex::new(None));

    let seen = completed.clone();
    let plugin = Plugin::builder("post-key")
        .cache_key_will_be_used(|params| async move {
            Ok(match params.mode {
                CacheKeyMode::Write => params.request.with_method(Method::POST),
                CacheKeyMode::Read => params.request,
            })
        })
        .handler_did_complete(move |params| {
            *seen.lock().unwrap() = Some(params.error.map(|error| error.to_string()));
            async { Ok(()) }
        })
        .build();

    let strategy = Strategy::cache_first(platform(&storage, &fetch))
        .plugin(plugin)
        .build();
    let fetch_event = event(URL);
    let (response, done) = strategy.handle_all(&fetch_event);

    assert_eq!(response.await.unwrap().text(), "fresh");
    let error = done.await.unwrap_err();
    assert!(matches!(error, StrategyError::Cache(CacheError::NonGetRequest { .. })));
    assert!(fetch_event.settled().await.is_err());

    let reported = completed.lock().unwrap().clone().unwrap();
    assert!(reported.unwrap().contains("only GET requests can be cached"));
    assert_eq!(storage.puts(), 0);
}

/// Test 8: Navigation requests use the preload response instead of fetching
#[tokio::test]
async fn test_navigation_preload_response_is_used() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "network");

    let fetch_event = FetchEvent::builder(Request::navigate(URL).unwrap())
        .preload_response(Response::ok("preloaded"))
        .build();
    let strategy = Strategy::network_only(platform(&storage, &fetch)).build();

    assert_eq!(strategy.handle(&fetch_event).await.unwrap().text(), "preloaded");
    assert_eq!(fetch.calls(), 0);
}

/// Test 9: Fetch options are passed through except for navigations
#[tokio::test]
async fn test_fetch_options_skip_navigation_requests() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "network");

    let options = FetchOptions::default().header(
        HeaderName::from_static("x-client"),
        HeaderValue::from_static("swkit"),
    );
    let strategy = Strategy::network_only(platform(&storage, &fetch))
        .fetch_options(options.clone())
        .build();

    strategy.handle(event(URL)).await.unwrap();
    strategy
        .handle(FetchEvent::new(Request::navigate(URL).unwrap()))
        .await
        .unwrap();

    assert_eq!(fetch.options(), vec![Some(options), None]);
}

/// Test 10: cacheDidUpdate gets the entry being replaced, ignoring the revision parameter
#[tokio::test]
async fn test_cache_did_update_receives_old_response() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    let new_url = "https://app.test/app.js?__WB_REVISION__=2";
    fetch.respond(new_url, "v2");
    storage.seed("assets", "https://app.test/app.js?__WB_REVISION__=1", Response::ok("v1"));
    let updates = Arc::new(Mutex::new(Vec::new()));

    let seen = updates.clone();
    let plugin = Plugin::builder("observer")
        .cache_did_update(move |params| {
            seen.lock().unwrap().push((
                params.old_response.map(|response| response.text().into_owned()),
                params.new_response.text().into_owned(),
            ));
            async { Ok(()) }
        })
        .build();

    let strategy = Strategy::cache_first(platform(&storage, &fetch))
        .cache_name("assets")
        .plugin(plugin)
        .build();
    let (response, done) = strategy.handle_all(event(new_url));
    response.await.unwrap();
    done.await.unwrap();

    assert_eq!(
        *updates.lock().unwrap(),
        vec![(Some("v1".to_string()), "v2".to_string())]
    );
}

/// Test 11: Plugin state lives for one request and is shared by that plugin's callbacks
#[tokio::test]
async fn test_plugin_state_is_per_request() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "network");
    let observed = Arc::new(Mutex::new(Vec::new()));

    let seen = observed.clone();
    let plugin = Plugin::builder("stateful")
        .handler_will_start(|params| {
            let previous = params.state.get::<u32>();
            params.state.insert(previous.unwrap_or(0) + 1);
            async { Ok(()) }
        })
        .handler_did_respond(move |params| {
            seen.lock().unwrap().push(params.state.get::<u32>());
            async { Ok(()) }
        })
        .build();

    let strategy = Strategy::network_only(platform(&storage, &fetch))
        .plugin(plugin)
        .build();
    for _ in 0..2 {
        let (response, done) = strategy.handle_all(event(URL));
        response.await.unwrap();
        done.await.unwrap();
    }

    assert_eq!(*observed.lock().unwrap(), vec![Some(1), Some(1)]);
}

/// Test 12: A cacheWillUpdate veto stops later plugins and skips the write
#[tokio::test]
async fn test_cache_will_update_veto() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "fresh");
    let later = Arc::new(Mutex::new(0));

    let counter = later.clone();
    let strategy = Strategy::network_first(platform(&storage, &fetch))
        .cache_name("pages")
        .plugin(Plugin::builder("veto").cache_will_update(|_| async { Ok(None) }))
        .plugin(Plugin::builder("later").cache_will_update(move |params| {
            *counter.lock().unwrap() += 1;
            async move { Ok(Some(params.response)) }
        }))
        .build();
    let (response, done) = strategy.handle_all(event(URL));

    assert_eq!(response.await.unwrap().text(), "fresh");
    done.await.unwrap();
    assert_eq!(storage.puts(), 0);
    assert_eq!(*later.lock().unwrap(), 0);
    assert_eq!(strategy.plugins().len(), 2);
}

/// Test 13: Each cacheKeyWillBeUsed callback receives the key returned by the previous plugin
#[tokio::test]
async fn test_cache_key_plugins_chain_in_order() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "fresh");
    let observed = Arc::new(Mutex::new(Vec::new()));

    let tag = Plugin::builder("tag").cache_key_will_be_used(|params| {
        let uri: Uri = format!("{}?p1", params.request.url_without_search())
            .parse()
            .unwrap();
        async move { Ok(params.request.with_uri(uri)) }
    });
    let seen = observed.clone();
    let watch = Plugin::builder("watch").cache_key_will_be_used(move |params| {
        seen.lock().unwrap().push(params.request.url());
        async move { Ok(params.request) }
    });

    let strategy = Strategy::cache_first(platform(&storage, &fetch))
        .cache_name("pages")
        .plugin(tag)
        .plugin(watch)
        .build();
    let (response, done) = strategy.handle_all(event(URL));
    assert_eq!(response.await.unwrap().text(), "fresh");
    done.await.unwrap();

    let tagged = format!("{URL}?p1");
    assert_eq!(*observed.lock().unwrap(), vec![tagged.clone(), tagged.clone()]);
    assert_eq!(storage.urls("pages"), vec![tagged]);
    assert_eq!(fetch.requests()[0].url(), URL);
}

/// Test 14: A plugin that always vetoes keeps the cache empty across repeated requests
#[tokio::test]
async fn test_cache_will_update_veto_is_idempotent() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "fresh");

    let strategy = Strategy::cache_first(platform(&storage, &fetch))
        .cache_name("pages")
        .plugin(Plugin::builder("never").cache_will_update(|_| async { Ok(None) }))
        .build();

    for _ in 0..5 {
        let (response, done) = strategy.handle_all(event(URL));
        assert_eq!(response.await.unwrap().text(), "fresh");
        done.await.unwrap();
    }

    assert_eq!(storage.puts(), 0);
    assert!(storage.urls("pages").is_empty());
    assert_eq!(fetch.calls(), 5);
}
