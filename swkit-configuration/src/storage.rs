//! Cache storage configuration.

use std::sync::Arc;

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};
use swkit_core::CacheStorage;

use crate::ConfigurationError;

/// Moka storage limits. Exactly one of the two must be set.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Moka {
    /// Entries kept per cache before least recently used URLs are evicted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<u64>,
    /// Byte budget shared by all caches; writes beyond it are quota errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<ByteSize>,
    /// Optional label for this storage (used in metrics/tracing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Storage the configured strategies run against.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Storage {
    /// In-memory storage from `swkit-moka`.
    Moka(Moka),
}

impl Storage {
    /// Builds the storage.
    pub fn into_storage(self) -> Result<Arc<dyn CacheStorage>, ConfigurationError> {
        match self {
            Storage::Moka(config) => config.into_storage(),
        }
    }
}

impl Moka {
    /// Builds a Moka storage.
    #[cfg(feature = "moka")]
    pub fn into_storage(self) -> Result<Arc<dyn CacheStorage>, ConfigurationError> {
        use swkit_moka::MokaCacheStorage;

        let builder = match self.label {
            Some(label) => MokaCacheStorage::builder().label(label),
            None => MokaCacheStorage::builder(),
        };
        let storage = match (self.max_entries, self.max_bytes) {
            (Some(entries), None) => builder.max_entries(entries).build(),
            (None, Some(bytes)) => builder.max_bytes(bytes.as_u64()).build(),
            (None, None) => {
                return Err(ConfigurationError::InvalidStorage(
                    "Moka needs maxEntries or maxBytes",
                ));
            }
            (Some(_), Some(_)) => {
                return Err(ConfigurationError::InvalidStorage(
                    "Moka accepts only one of maxEntries and maxBytes",
                ));
            }
        };
        Ok(Arc::new(storage))
    }

    /// Builds a Moka storage.
    #[cfg(not(feature = "moka"))]
    pub fn into_storage(self) -> Result<Arc<dyn CacheStorage>, ConfigurationError> {
        Err(ConfigurationError::StorageNotAvailable("Moka".to_string()))
    }
}
