//! Builder for configuring [`MokaCacheStorage`].

use std::sync::Arc;

use moka::policy::EvictionPolicy;
use smol_str::SmolStr;

use crate::storage::{Limit, MokaCacheStorage, Quota};

/// Marker type: capacity has not been configured yet.
///
/// This is the initial state of a [`MokaCacheStorageBuilder`]. You must call
/// either [`max_entries()`](MokaCacheStorageBuilder::max_entries) or
/// [`max_bytes()`](MokaCacheStorageBuilder::max_bytes) before calling `build()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// Marker type: every cache holds at most `n` entries, evicting least recently
/// used URLs beyond that.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(pub(crate) u64);

/// Marker type: all caches together may use at most `n` bytes (approximate).
/// Writes beyond the budget fail with a quota error.
#[derive(Debug, Clone, Copy)]
pub struct ByteCapacity(pub(crate) u64);

/// Builder for creating and configuring a [`MokaCacheStorage`].
///
/// Use [`MokaCacheStorage::builder`] to create a new builder instance.
///
/// # Capacity Configuration (Required)
///
/// You must configure capacity using exactly one of:
/// - [`max_entries(n)`](Self::max_entries) - evict per cache by entry count
/// - [`max_bytes(n)`](Self::max_bytes) - reject writes beyond a byte budget
///
/// The typestate makes `build()` available only after capacity is set, and
/// rules out setting both.
///
/// # Examples
///
/// ```
/// use swkit_moka::{EvictionPolicy, MokaCacheStorage};
///
/// let storage = MokaCacheStorage::builder()
///     .label("images")
///     .max_entries(1_000)
///     .eviction_policy(EvictionPolicy::tiny_lfu())
///     .build();
/// ```
pub struct MokaCacheStorageBuilder<Cap> {
    capacity: Cap,
    label: SmolStr,
    eviction_policy: Option<EvictionPolicy>,
}

impl MokaCacheStorageBuilder<NoCapacity> {
    /// Creates a new builder with no capacity configured.
    pub fn new() -> Self {
        Self {
            capacity: NoCapacity,
            label: SmolStr::new_static("moka"),
            eviction_policy: None,
        }
    }

    /// Sets the maximum number of entries each cache can hold.
    ///
    /// Entries are counted per stored request, and whole URLs are evicted.
    pub fn max_entries(self, capacity: u64) -> MokaCacheStorageBuilder<EntryCapacity> {
        MokaCacheStorageBuilder {
            capacity: EntryCapacity(capacity),
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }

    /// Sets the storage-wide byte budget.
    ///
    /// An entry is charged its URL, body and header bytes plus a fixed
    /// overhead of 112 bytes. Replacing an entry releases the old charge
    /// first; deleting a cache releases all of its charges.
    pub fn max_bytes(self, bytes: u64) -> MokaCacheStorageBuilder<ByteCapacity> {
        MokaCacheStorageBuilder {
            capacity: ByteCapacity(bytes),
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }
}

impl Default for MokaCacheStorageBuilder<NoCapacity> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Cap> MokaCacheStorageBuilder<Cap> {
    /// Sets a custom label for this storage.
    ///
    /// # Default
    ///
    /// `"moka"`
    pub fn label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the eviction policy used with [`max_entries`](MokaCacheStorageBuilder::max_entries).
    ///
    /// # Default
    ///
    /// [`EvictionPolicy::lru()`]. TinyLFU may refuse to admit a fresh entry,
    /// which would make a successful `put` invisible to the next lookup.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }
}

impl MokaCacheStorageBuilder<EntryCapacity> {
    /// Builds the storage with per-cache entry limits.
    pub fn build(self) -> MokaCacheStorage {
        MokaCacheStorage::new(
            self.label,
            Limit::Entries(self.capacity.0),
            self.eviction_policy,
        )
    }
}

impl MokaCacheStorageBuilder<ByteCapacity> {
    /// Builds the storage with a shared byte budget.
    pub fn build(self) -> MokaCacheStorage {
        MokaCacheStorage::new(
            self.label,
            Limit::Bytes(Arc::new(Quota::new(self.capacity.0))),
            self.eviction_policy,
        )
    }
}
