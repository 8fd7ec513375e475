//! Plugins shipped with the crate.

mod cacheable_response;
mod expiration;

use swkit_core::Response;

pub use cacheable_response::{
    CacheableResponse, CacheableResponseOptions, cacheable_response_plugin,
};
pub use expiration::{CacheExpiration, ExpirationOptions, ExpirationPlugin};

use crate::plugin::Plugin;

/// Accepts status 200 and opaque (status 0) responses for caching.
///
/// Strategies that revalidate from the network get this plugin when no other
/// plugin decides cacheability.
pub fn cache_ok_and_opaque() -> Plugin {
    Plugin::builder("cache-ok-and-opaque")
        .cache_will_update(|params| async move {
            Ok(is_ok_or_opaque(&params.response).then_some(params.response))
        })
        .build()
}

fn is_ok_or_opaque(response: &Response) -> bool {
    matches!(response.status(), 0 | 200)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::LifecyclePoint;

    #[test]
    fn ok_and_opaque_only_decides_cacheability() {
        let plugin = cache_ok_and_opaque();
        assert!(plugin.has(LifecyclePoint::CacheWillUpdate));
        assert!(!plugin.has(LifecyclePoint::CacheDidUpdate));
        assert!(is_ok_or_opaque(&Response::ok("x")));
        assert!(is_ok_or_opaque(&Response::opaque()));
        assert!(!is_ok_or_opaque(&Response::new(http::StatusCode::NOT_FOUND, "")));
    }
}
