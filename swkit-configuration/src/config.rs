//! Top-level configuration document.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use swkit::cache_names::{self, CacheNameDetails};
use swkit::{Platform, Router};
use swkit_core::Fetch;
use tracing::debug;

use crate::ConfigurationError;
use crate::runtime::RuntimeCaching;
use crate::storage::Storage;

/// Cache-name details. Unset fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CacheNames {
    /// Prefix of every generated name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<SmolStr>,
    /// Suffix of every generated name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<SmolStr>,
    /// Role name of the precache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precache: Option<SmolStr>,
    /// Role name of the runtime cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<SmolStr>,
    /// Role name of the analytics cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_analytics: Option<SmolStr>,
}

impl From<CacheNames> for CacheNameDetails {
    fn from(names: CacheNames) -> Self {
        CacheNameDetails {
            prefix: names.prefix,
            suffix: names.suffix,
            precache: names.precache,
            runtime: names.runtime,
            google_analytics: names.google_analytics,
        }
    }
}

/// A runtime-caching configuration.
///
/// ```
/// use swkit_configuration::Config;
///
/// let config = Config::from_yaml(r#"
/// origin: https://app.example
/// runtimeCaching:
///   - urlPattern:
///       Path: /api/items
///     handler: NetworkFirst
/// "#).unwrap();
/// assert_eq!(config.runtime_caching.len(), 1);
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Origin of the worker. Relative URLs are resolved against it.
    pub origin: String,
    /// Shorthand for `cacheNames.prefix`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_id: Option<SmolStr>,
    /// Process-wide cache-name details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_names: Option<CacheNames>,
    /// Storage the strategies run against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,
    /// Routes, first match wins.
    #[serde(default)]
    pub runtime_caching: Vec<RuntimeCaching>,
}

impl Config {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_saphyr::from_str(yaml)?)
    }

    /// Checks every runtime-caching entry without building anything.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.runtime_caching
            .iter()
            .enumerate()
            .try_for_each(|(index, entry)| entry.validate(index))
    }

    /// Applies `cacheId` and `cacheNames` to the process-wide cache names.
    pub fn apply_cache_names(&self) -> Result<(), ConfigurationError> {
        let mut details: CacheNameDetails = self.cache_names.clone().unwrap_or_default().into();
        if let Some(cache_id) = &self.cache_id {
            details.prefix.get_or_insert_with(|| cache_id.clone());
        }
        if details != CacheNameDetails::default() {
            cache_names::set_cache_name_details(details)?;
        }
        Ok(())
    }

    /// Applies the cache names and registers every route on a new router.
    ///
    /// Every entry is checked before the cache names change or any plugin is
    /// built, so a rejected document leaves no process-wide state behind.
    pub fn into_router(mut self, platform: Platform) -> Result<Router, ConfigurationError> {
        self.validate()?;
        let prepared = std::mem::take(&mut self.runtime_caching)
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.prepare(index, &self.origin))
            .collect::<Result<Vec<_>, _>>()?;
        self.apply_cache_names()?;

        let mut router = Router::new(self.origin.clone());
        for route in prepared {
            router.register_route(route.into_route(platform.clone())?);
        }
        debug!(origin = %self.origin, "runtime caching router ready");
        Ok(router)
    }

    /// Like [`into_router`](Self::into_router), building the platform from the
    /// `storage` section and `fetcher`.
    pub fn into_router_with_fetcher(
        mut self,
        fetcher: impl Fetch + 'static,
    ) -> Result<Router, ConfigurationError> {
        let storage = self
            .storage
            .take()
            .ok_or(ConfigurationError::InvalidStorage("a storage section is required"))?
            .into_storage()?;
        self.into_router(Platform::from_shared(storage, Arc::new(fetcher)))
    }
}
