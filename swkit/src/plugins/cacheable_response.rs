use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use swkit_core::Response;
use tracing::debug;

use crate::error::ConfigError;
use crate::plugin::Plugin;

/// Criteria a response must meet to be cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheableResponseOptions {
    /// Acceptable statuses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statuses: Option<Vec<u16>>,
    /// Header values, any one of which must be present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

impl CacheableResponseOptions {
    /// Requires one of `statuses`.
    pub fn statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    /// Accepts responses where header `name` equals `value`.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// Decides cacheability from a response's status and headers.
///
/// A response is cacheable when its status is listed (if statuses are
/// configured) and at least one configured header has the configured value
/// (if headers are configured).
#[derive(Debug, Clone)]
pub struct CacheableResponse {
    statuses: Option<Vec<u16>>,
    headers: Option<BTreeMap<String, String>>,
}

impl CacheableResponse {
    /// Fails when neither statuses nor headers are given.
    pub fn new(options: CacheableResponseOptions) -> Result<Self, ConfigError> {
        if options.statuses.is_none() && options.headers.is_none() {
            return Err(ConfigError::InvalidPluginOptions(
                "statuses-or-headers-required: a cacheable response needs statuses or headers",
            ));
        }
        Ok(CacheableResponse {
            statuses: options.statuses,
            headers: options.headers,
        })
    }

    /// Whether `response` meets the criteria.
    pub fn is_response_cacheable(&self, response: &Response) -> bool {
        let status_ok = self
            .statuses
            .as_ref()
            .is_none_or(|statuses| statuses.contains(&response.status()));

        let cacheable = status_ok
            && self.headers.as_ref().is_none_or(|headers| {
                headers
                    .iter()
                    .any(|(name, value)| response.header(name) == Some(value.as_str()))
            });

        if !cacheable {
            debug!(
                status = response.status(),
                statuses = ?self.statuses,
                headers = ?self.headers,
                "response does not meet the criteria for being cached"
            );
        }
        cacheable
    }

    /// Wraps the criteria in a `cacheWillUpdate` plugin.
    pub fn into_plugin(self) -> Plugin {
        Plugin::builder("cacheable-response")
            .cache_will_update(move |params| {
                let cacheable = self.is_response_cacheable(&params.response);
                async move { Ok(cacheable.then_some(params.response)) }
            })
            .build()
    }
}

/// Shorthand for `CacheableResponse::new(options)?.into_plugin()`.
pub fn cacheable_response_plugin(options: CacheableResponseOptions) -> Result<Plugin, ConfigError> {
    CacheableResponse::new(options).map(CacheableResponse::into_plugin)
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http::header::{HeaderName, HeaderValue};

    use super::*;

    fn response(status: u16, header: Option<(&'static str, &'static str)>) -> Response {
        let response = Response::new(StatusCode::from_u16(status).unwrap_or(StatusCode::OK), "");
        let response = if status == 0 { Response::opaque() } else { response };
        match header {
            Some((name, value)) => response.with_header(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ),
            None => response,
        }
    }

    #[test]
    fn requires_some_criteria() {
        let error = CacheableResponse::new(CacheableResponseOptions::default()).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidPluginOptions(_)));
    }

    #[test]
    fn statuses_only() {
        let criteria =
            CacheableResponse::new(CacheableResponseOptions::default().statuses([0, 200]))
                .unwrap();
        assert!(criteria.is_response_cacheable(&response(200, None)));
        assert!(criteria.is_response_cacheable(&response(0, None)));
        assert!(!criteria.is_response_cacheable(&response(404, None)));
    }

    #[test]
    fn status_and_any_header_must_hold() {
        let criteria = CacheableResponse::new(
            CacheableResponseOptions::default()
                .statuses([200])
                .header("x-cache", "yes")
                .header("x-public", "true"),
        )
        .unwrap();

        assert!(criteria.is_response_cacheable(&response(200, Some(("x-public", "true")))));
        assert!(!criteria.is_response_cacheable(&response(200, Some(("x-cache", "no")))));
        assert!(!criteria.is_response_cacheable(&response(200, None)));
        assert!(!criteria.is_response_cacheable(&response(500, Some(("x-cache", "yes")))));
    }
}
