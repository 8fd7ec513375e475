//! Metrics declaration and recording.
//!
//! With the `metrics` feature enabled the recording functions report to the
//! global [`metrics`] recorder; without it they compile to nothing.

use std::time::Duration;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of cache hits.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "swkit_cache_hit_total",
            "Total number of cache lookups that found a response."
        );
        "swkit_cache_hit_total"
    };
    /// Track number of cache misses.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "swkit_cache_miss_total",
            "Total number of cache lookups that found nothing."
        );
        "swkit_cache_miss_total"
    };
    /// Track number of successful network fetches.
    pub static ref FETCH_SUCCESS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "swkit_fetch_success_total",
            "Total number of network fetches that produced a response."
        );
        "swkit_fetch_success_total"
    };
    /// Track number of failed network fetches.
    pub static ref FETCH_FAILURE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "swkit_fetch_failure_total",
            "Total number of network fetches that failed."
        );
        "swkit_fetch_failure_total"
    };
    /// Track number of cache writes.
    pub static ref CACHE_WRITE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "swkit_cache_write_total",
            "Total number of responses written into a cache."
        );
        "swkit_cache_write_total"
    };
    /// Track number of cache writes skipped because a response was not cacheable.
    pub static ref CACHE_WRITE_VETOED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "swkit_cache_write_vetoed_total",
            "Total number of cache writes skipped as not cacheable."
        );
        "swkit_cache_write_vetoed_total"
    };
    /// Track number of quota-exceeded events.
    pub static ref QUOTA_ERROR_COUNTER: &'static str = {
        metrics::describe_counter!(
            "swkit_quota_error_total",
            "Total number of cache writes that exceeded the storage quota."
        );
        "swkit_quota_error_total"
    };
    /// Histogram of request handling duration.
    pub static ref HANDLER_DURATION: &'static str = {
        metrics::describe_histogram!(
            "swkit_handler_duration_seconds",
            metrics::Unit::Seconds,
            "Time from handler start until the response is available."
        );
        "swkit_handler_duration_seconds"
    };
}

/// Records a cache lookup result.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_cache_lookup(cache_name: &str, hit: bool) {
    let counter = if hit {
        *CACHE_HIT_COUNTER
    } else {
        *CACHE_MISS_COUNTER
    };
    metrics::counter!(counter, "cache" => cache_name.to_string()).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_cache_lookup(_cache_name: &str, _hit: bool) {}

/// Records a network fetch result.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_fetch(success: bool) {
    let counter = if success {
        *FETCH_SUCCESS_COUNTER
    } else {
        *FETCH_FAILURE_COUNTER
    };
    metrics::counter!(counter).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_fetch(_success: bool) {}

/// Records a cache write, or a write skipped because the response was not cacheable.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_cache_write(cache_name: &str, written: bool) {
    let counter = if written {
        *CACHE_WRITE_COUNTER
    } else {
        *CACHE_WRITE_VETOED_COUNTER
    };
    metrics::counter!(counter, "cache" => cache_name.to_string()).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_cache_write(_cache_name: &str, _written: bool) {}

/// Records a quota-exceeded event.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_quota_error() {
    metrics::counter!(*QUOTA_ERROR_COUNTER).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_quota_error() {}

/// Records how long a strategy took to produce its response.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_handler_duration(strategy: &'static str, outcome: &'static str, duration: Duration) {
    metrics::histogram!(
        *HANDLER_DURATION,
        "strategy" => strategy,
        "outcome" => outcome
    )
    .record(duration.as_secs_f64());
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_handler_duration(
    _strategy: &'static str,
    _outcome: &'static str,
    _duration: Duration,
) {
}
