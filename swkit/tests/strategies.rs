//! Behavior of the five strategies against an in-memory storage and a
//! scripted fetcher.

mod common;

use std::time::Duration;

use common::{MockFetch, Reply, TestStorage, event, platform};
use http::StatusCode;
use swkit::{Strategy, StrategyError};
use swkit_core::{FetchError, Response};

const URL: &str = "https://app.test/data.json";

fn no_response_source(error: StrategyError) -> Option<StrategyError> {
    match error {
        StrategyError::NoResponse { source, .. } => source.map(|source| *source),
        other => panic!("expected no-response, got {other:?}"),
    }
}

/// Test 1: CacheFirst answers from the cache without touching the network
#[tokio::test]
async fn test_cache_first_hit_skips_network() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    storage.seed("data", URL, Response::ok("cached"));

    let strategy = Strategy::cache_first(platform(&storage, &fetch))
        .cache_name("data")
        .build();
    let (response, done) = strategy.handle_all(event(URL));

    assert_eq!(response.await.unwrap().text(), "cached");
    done.await.unwrap();
    assert_eq!(fetch.calls(), 0);
    assert_eq!(storage.puts(), 0);
}

/// Test 2: CacheFirst fetches on a miss and writes the response in the background
#[tokio::test]
async fn test_cache_first_miss_fetches_and_caches() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "fresh");

    let strategy = Strategy::cache_first(platform(&storage, &fetch))
        .cache_name("data")
        .build();
    let (response, done) = strategy.handle_all(event(URL));

    assert_eq!(response.await.unwrap().text(), "fresh");
    done.await.unwrap();
    assert_eq!(fetch.calls(), 1);
    assert_eq!(storage.get("data", URL).unwrap().text(), "fresh");

    let second = strategy.handle(event(URL)).await.unwrap();
    assert_eq!(second.text(), "fresh");
    assert_eq!(fetch.calls(), 1);
}

/// Test 3: CacheFirst with an empty cache and a failing network reports no-response with the cause
#[tokio::test]
async fn test_cache_first_miss_and_network_failure() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.fail(URL);

    let strategy = Strategy::cache_first(platform(&storage, &fetch)).build();
    let error = strategy.handle(event(URL)).await.unwrap_err();

    assert!(error.to_string().starts_with("no-response"));
    assert!(matches!(
        no_response_source(error),
        Some(StrategyError::Fetch(FetchError::Network(_)))
    ));
}

/// Test 4: CacheFirst does not cache non-200 responses without a cacheWillUpdate plugin
#[tokio::test]
async fn test_cache_first_does_not_cache_errors_or_opaque_by_default() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.reply(URL, Reply::Respond(Response::new(StatusCode::NOT_FOUND, "missing")));
    fetch.reply("https://cdn.test/lib.js", Reply::Respond(Response::opaque()));

    let strategy = Strategy::cache_first(platform(&storage, &fetch))
        .cache_name("data")
        .build();

    let (response, done) = strategy.handle_all(event(URL));
    assert_eq!(response.await.unwrap().status(), 404);
    done.await.unwrap();

    let (response, done) = strategy.handle_all(event("https://cdn.test/lib.js"));
    assert_eq!(response.await.unwrap().status(), 0);
    done.await.unwrap();

    assert_eq!(storage.puts(), 0);
}

/// Test 5: CacheOnly answers from the cache or fails without fetching
#[tokio::test]
async fn test_cache_only() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "network");

    let strategy = Strategy::cache_only(platform(&storage, &fetch))
        .cache_name("data")
        .build();

    let error = strategy.handle(event(URL)).await.unwrap_err();
    assert!(error.is_no_response());
    assert!(no_response_source(error).is_none());

    storage.seed("data", URL, Response::ok("cached"));
    assert_eq!(strategy.handle(event(URL)).await.unwrap().text(), "cached");
    assert_eq!(fetch.calls(), 0);
}

/// Test 6: NetworkOnly never reads or writes the cache
#[tokio::test]
async fn test_network_only_success_and_failure() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "network");
    fetch.fail("https://app.test/down");
    storage.seed("data", "https://app.test/down", Response::ok("cached"));

    let strategy = Strategy::network_only(platform(&storage, &fetch))
        .cache_name("data")
        .build();

    let (response, done) = strategy.handle_all(event(URL));
    assert_eq!(response.await.unwrap().text(), "network");
    done.await.unwrap();
    assert_eq!(storage.puts(), 0);

    let error = strategy.handle(event("https://app.test/down")).await.unwrap_err();
    assert!(matches!(
        no_response_source(error),
        Some(StrategyError::Fetch(FetchError::Network(_)))
    ));
}

/// Test 7: NetworkOnly gives up after its timeout
#[tokio::test(start_paused = true)]
async fn test_network_only_timeout() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.reply(URL, Reply::Delayed(Duration::from_secs(10), Response::ok("late")));

    let strategy = Strategy::network_only(platform(&storage, &fetch))
        .network_timeout(Duration::from_secs(2))
        .build();

    let error = strategy.handle(event(URL)).await.unwrap_err();
    assert!(matches!(
        no_response_source(error),
        Some(StrategyError::Fetch(FetchError::Timeout(timeout)))
            if timeout == Duration::from_secs(2)
    ));
}

/// Test 8: NetworkFirst caches successful responses
#[tokio::test]
async fn test_network_first_caches_network_response() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "fresh");
    storage.seed("data", URL, Response::ok("stale"));

    let strategy = Strategy::network_first(platform(&storage, &fetch))
        .cache_name("data")
        .build();
    let (response, done) = strategy.handle_all(event(URL));

    assert_eq!(response.await.unwrap().text(), "fresh");
    done.await.unwrap();
    assert_eq!(storage.get("data", URL).unwrap().text(), "fresh");
}

/// Test 9: NetworkFirst falls back to the cache when the network fails
#[tokio::test]
async fn test_network_first_falls_back_to_cache() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.fail(URL);
    storage.seed("data", URL, Response::ok("stale"));

    let strategy = Strategy::network_first(platform(&storage, &fetch))
        .cache_name("data")
        .build();

    assert_eq!(strategy.handle(event(URL)).await.unwrap().text(), "stale");
}

/// Test 10: NetworkFirst with nothing cached and a failing network reports no-response
#[tokio::test]
async fn test_network_first_without_any_response() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.fail(URL);

    let strategy = Strategy::network_first(platform(&storage, &fetch)).build();
    let error = strategy.handle(event(URL)).await.unwrap_err();

    assert!(error.is_no_response());
}

/// Test 11: NetworkFirst serves the cache after the timeout and still caches the late response
#[tokio::test(start_paused = true)]
async fn test_network_first_timeout_uses_cache_then_updates_it() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.reply(URL, Reply::Delayed(Duration::from_secs(10), Response::ok("fresh")));
    storage.seed("data", URL, Response::ok("stale"));

    let strategy = Strategy::network_first(platform(&storage, &fetch))
        .cache_name("data")
        .network_timeout(Duration::from_secs(3))
        .build();
    let (response, done) = strategy.handle_all(event(URL));

    assert_eq!(response.await.unwrap().text(), "stale");
    assert_eq!(storage.get("data", URL).unwrap().text(), "stale");

    done.await.unwrap();
    assert_eq!(storage.get("data", URL).unwrap().text(), "fresh");
}

/// Test 12: NetworkFirst keeps waiting for the network when the timeout finds nothing cached
#[tokio::test(start_paused = true)]
async fn test_network_first_timeout_with_empty_cache_waits_for_network() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.reply(URL, Reply::Delayed(Duration::from_secs(10), Response::ok("slow")));

    let strategy = Strategy::network_first(platform(&storage, &fetch))
        .cache_name("data")
        .network_timeout(Duration::from_secs(3))
        .build();

    assert_eq!(strategy.handle(event(URL)).await.unwrap().text(), "slow");
}

/// Test 13: NetworkFirst caches opaque responses through its default plugin
#[tokio::test]
async fn test_network_first_caches_opaque_responses() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.reply(URL, Reply::Respond(Response::opaque()));

    let strategy = Strategy::network_first(platform(&storage, &fetch))
        .cache_name("data")
        .build();
    let (response, done) = strategy.handle_all(event(URL));

    assert_eq!(response.await.unwrap().status(), 0);
    done.await.unwrap();
    assert_eq!(storage.get("data", URL).unwrap().status(), 0);
}

/// Test 14: StaleWhileRevalidate serves the cached response and refreshes the cache
#[tokio::test]
async fn test_stale_while_revalidate_hit_revalidates() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "fresh");
    storage.seed("data", URL, Response::ok("stale"));

    let strategy = Strategy::stale_while_revalidate(platform(&storage, &fetch))
        .cache_name("data")
        .build();
    let (response, done) = strategy.handle_all(event(URL));

    assert_eq!(response.await.unwrap().text(), "stale");
    done.await.unwrap();
    assert_eq!(fetch.calls(), 1);
    assert_eq!(storage.puts(), 1);
    assert_eq!(storage.get("data", URL).unwrap().text(), "fresh");
}

/// Test 15: StaleWhileRevalidate waits for the network on a miss
#[tokio::test]
async fn test_stale_while_revalidate_miss_uses_network() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "fresh");

    let strategy = Strategy::stale_while_revalidate(platform(&storage, &fetch))
        .cache_name("data")
        .build();
    let (response, done) = strategy.handle_all(event(URL));

    assert_eq!(response.await.unwrap().text(), "fresh");
    done.await.unwrap();
    assert_eq!(fetch.calls(), 1);
    assert_eq!(storage.puts(), 1);
}

/// Test 16: StaleWhileRevalidate with neither cache nor network reports the network failure
#[tokio::test]
async fn test_stale_while_revalidate_without_any_response() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.fail(URL);

    let strategy = Strategy::stale_while_revalidate(platform(&storage, &fetch)).build();
    let (response, done) = strategy.handle_all(event(URL));

    let error = response.await.unwrap_err();
    assert!(matches!(
        no_response_source(error),
        Some(StrategyError::Fetch(FetchError::Network(_)))
    ));
    done.await.unwrap();
}

/// Test 17: A failed revalidation does not fail a cached answer
#[tokio::test]
async fn test_stale_while_revalidate_failed_revalidation_is_silent() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.fail(URL);
    storage.seed("data", URL, Response::ok("stale"));

    let strategy = Strategy::stale_while_revalidate(platform(&storage, &fetch))
        .cache_name("data")
        .build();
    let (response, done) = strategy.handle_all(event(URL));

    assert_eq!(response.await.unwrap().text(), "stale");
    done.await.unwrap();
    assert_eq!(storage.get("data", URL).unwrap().text(), "stale");
}

/// Test 18: A network-error response counts as no response
#[tokio::test]
async fn test_error_response_is_no_response() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.reply(URL, Reply::Respond(Response::error()));

    let strategy = Strategy::network_only(platform(&storage, &fetch)).build();
    let error = strategy.handle(event(URL)).await.unwrap_err();

    assert!(error.is_no_response());
}

/// Test 19: The event stays pending until the cache write has finished
#[tokio::test(start_paused = true)]
async fn test_event_settles_after_background_write() {
    let storage = TestStorage::new();
    let fetch = MockFetch::new();
    fetch.respond(URL, "fresh");

    let strategy = Strategy::cache_first(platform(&storage, &fetch))
        .cache_name("data")
        .build();
    let fetch_event = event(URL);
    let (response, done) = strategy.handle_all(&fetch_event);
    drop(done);

    assert_eq!(response.await.unwrap().text(), "fresh");
    fetch_event.settled().await.unwrap();
    assert_eq!(storage.get("data", URL).unwrap().text(), "fresh");
}
