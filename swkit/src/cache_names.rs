//! Process-wide cache naming.
//!
//! Strategies that are not given an explicit cache name write into the
//! runtime cache, whose concrete name is derived from a set of details shared
//! by the whole process:
//!
//! ```text
//! <prefix>-<role>-<suffix>
//! ```
//!
//! Empty components are dropped, so with the defaults and no scope the
//! runtime cache is called `workbox-runtime`. The suffix defaults to the
//! worker scope once [`set_scope`] has been called.
//!
//! ```
//! use swkit::cache_names::{self, CacheNameDetails};
//!
//! cache_names::reset();
//! cache_names::set_scope("https://example.com/");
//! assert_eq!(cache_names::runtime_name(None), "workbox-runtime-https://example.com/");
//!
//! cache_names::set_cache_name_details(CacheNameDetails {
//!     prefix: Some("app".into()),
//!     suffix: Some("v2".into()),
//!     ..Default::default()
//! })
//! .unwrap();
//! assert_eq!(cache_names::precache_name(), "app-precache-v2-v2");
//! assert_eq!(cache_names::runtime_name(Some("images")), "images");
//! cache_names::reset();
//! ```

use std::sync::{PoisonError, RwLock};

use lazy_static::lazy_static;
use smol_str::SmolStr;

use crate::error::ConfigError;

const DEFAULT_PREFIX: &str = "workbox";
const DEFAULT_PRECACHE: &str = "precache-v2";
const DEFAULT_RUNTIME: &str = "runtime";
const DEFAULT_GOOGLE_ANALYTICS: &str = "googleAnalytics";

#[derive(Debug, Clone)]
struct NameDetails {
    prefix: SmolStr,
    suffix: Option<SmolStr>,
    precache: SmolStr,
    runtime: SmolStr,
    google_analytics: SmolStr,
    scope: Option<SmolStr>,
}

impl Default for NameDetails {
    fn default() -> Self {
        NameDetails {
            prefix: SmolStr::new_static(DEFAULT_PREFIX),
            suffix: None,
            precache: SmolStr::new_static(DEFAULT_PRECACHE),
            runtime: SmolStr::new_static(DEFAULT_RUNTIME),
            google_analytics: SmolStr::new_static(DEFAULT_GOOGLE_ANALYTICS),
            scope: None,
        }
    }
}

impl NameDetails {
    fn suffix(&self) -> &str {
        self.suffix
            .as_deref()
            .or(self.scope.as_deref())
            .unwrap_or_default()
    }

    fn create(&self, role: &str) -> SmolStr {
        let parts = [self.prefix.as_str(), role, self.suffix()];
        let joined = parts
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("-");
        SmolStr::new(joined)
    }
}

lazy_static! {
    static ref DETAILS: RwLock<NameDetails> = RwLock::new(NameDetails::default());
}

fn read<T>(f: impl FnOnce(&NameDetails) -> T) -> T {
    let details = DETAILS.read().unwrap_or_else(PoisonError::into_inner);
    f(&details)
}

fn write<T>(f: impl FnOnce(&mut NameDetails) -> T) -> T {
    let mut details = DETAILS.write().unwrap_or_else(PoisonError::into_inner);
    f(&mut details)
}

/// Partial update of the cache-name details. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheNameDetails {
    /// Prefix of every generated name. May be empty.
    pub prefix: Option<SmolStr>,
    /// Suffix of every generated name. May be empty.
    pub suffix: Option<SmolStr>,
    /// Role name of the precache.
    pub precache: Option<SmolStr>,
    /// Role name of the runtime cache.
    pub runtime: Option<SmolStr>,
    /// Role name of the analytics cache.
    pub google_analytics: Option<SmolStr>,
}

/// Sets the worker scope, used as the suffix until one is set explicitly.
pub fn set_scope(scope: impl Into<SmolStr>) {
    let scope = scope.into();
    write(|details| details.scope = Some(scope));
}

/// Updates the cache-name details.
///
/// Fails without changing anything when `precache`, `runtime` or
/// `google_analytics` is set to an empty string.
pub fn set_cache_name_details(update: CacheNameDetails) -> Result<(), ConfigError> {
    for (field, value) in [
        ("precache", &update.precache),
        ("runtime", &update.runtime),
        ("googleAnalytics", &update.google_analytics),
    ] {
        if value.as_ref().is_some_and(|value| value.is_empty()) {
            return Err(ConfigError::EmptyCacheName(field));
        }
    }

    write(|details| {
        if let Some(prefix) = update.prefix {
            details.prefix = prefix;
        }
        if let Some(suffix) = update.suffix {
            details.suffix = Some(suffix);
        }
        if let Some(precache) = update.precache {
            details.precache = precache;
        }
        if let Some(runtime) = update.runtime {
            details.runtime = runtime;
        }
        if let Some(google_analytics) = update.google_analytics {
            details.google_analytics = google_analytics;
        }
    });
    Ok(())
}

/// Name of the precache.
pub fn precache_name() -> SmolStr {
    read(|details| details.create(&details.precache))
}

/// `user` when given, otherwise the name of the runtime cache.
pub fn runtime_name(user: Option<&str>) -> SmolStr {
    match user {
        Some(name) => SmolStr::new(name),
        None => read(|details| details.create(&details.runtime)),
    }
}

/// Name of the analytics cache.
pub fn google_analytics_name() -> SmolStr {
    read(|details| details.create(&details.google_analytics))
}

/// Current prefix.
pub fn prefix() -> SmolStr {
    read(|details| details.prefix.clone())
}

/// Current suffix.
pub fn suffix() -> SmolStr {
    read(|details| SmolStr::new(details.suffix()))
}

/// Restores the defaults and forgets the scope.
pub fn reset() {
    write(|details| *details = NameDetails::default());
}
