//! Moka storage capacity metrics.
//!
//! Enable the `metrics` feature to record them.
//!
//! ## Metrics
//!
//! - `swkit_moka_entries` - Current number of URLs in a cache (gauge)
//! - `swkit_moka_size_bytes` - Bytes charged against the storage quota (gauge)
//!
//! Both metrics carry `storage` and `cache` labels.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for cache entry count gauge.
    pub static ref MOKA_ENTRIES: &'static str = {
        metrics::describe_gauge!(
            "swkit_moka_entries",
            "Current number of URLs held by a Moka cache."
        );
        "swkit_moka_entries"
    };

    /// Metric name for quota usage gauge.
    pub static ref MOKA_SIZE_BYTES: &'static str = {
        metrics::describe_gauge!(
            "swkit_moka_size_bytes",
            "Bytes charged against the Moka storage quota."
        );
        "swkit_moka_size_bytes"
    };
}

/// Records the entry count of `cache` and the bytes used by its storage.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_capacity(storage: &str, cache: &str, entries: u64, size_bytes: u64) {
    metrics::gauge!(
        *MOKA_ENTRIES,
        "storage" => storage.to_string(),
        "cache" => cache.to_string()
    )
    .set(entries as f64);
    metrics::gauge!(
        *MOKA_SIZE_BYTES,
        "storage" => storage.to_string(),
        "cache" => cache.to_string()
    )
    .set(size_bytes as f64);
}

/// Records capacity metrics (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_capacity(_storage: &str, _cache: &str, _entries: u64, _size_bytes: u64) {}
