//! Process-wide quota-error callbacks.
//!
//! When a cache write fails with [`CacheError::QuotaExceeded`], every
//! registered callback runs once, one after another, so that eviction
//! callbacks never race each other.
//!
//! [`CacheError::QuotaExceeded`]: swkit_core::CacheError::QuotaExceeded

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use futures::future::BoxFuture;
use lazy_static::lazy_static;
use tracing::{debug, warn};

use crate::error::{PluginError, StrategyError};

/// A callback run when storage quota is exceeded.
pub type QuotaErrorCallback =
    Arc<dyn Fn() -> BoxFuture<'static, Result<(), PluginError>> + Send + Sync>;

lazy_static! {
    static ref CALLBACKS: RwLock<Vec<QuotaErrorCallback>> = RwLock::new(Vec::new());
}

/// Registers `callback`. Callbacks run in registration order.
pub fn register_quota_error_callback<F, Fut>(callback: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), PluginError>> + Send + 'static,
{
    let callback: QuotaErrorCallback = Arc::new(move || callback().boxed());
    CALLBACKS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(callback);
}

/// Number of registered callbacks.
pub fn quota_error_callback_count() -> usize {
    CALLBACKS.read().unwrap_or_else(PoisonError::into_inner).len()
}

/// Runs every registered callback sequentially, awaiting each in turn.
///
/// The first failing callback ends the run and its error is returned.
pub async fn execute_quota_error_callbacks() -> Result<(), StrategyError> {
    let callbacks = CALLBACKS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();

    debug!(count = callbacks.len(), "running quota error callbacks");
    crate::metrics::record_quota_error();

    for (index, callback) in callbacks.iter().enumerate() {
        if let Err(error) = callback().await {
            warn!(index, %error, "quota error callback failed");
            return Err(StrategyError::QuotaCallback(error));
        }
    }

    debug!("finished running quota error callbacks");
    Ok(())
}

/// Removes every registered callback.
pub fn clear_quota_error_callbacks() {
    CALLBACKS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}
