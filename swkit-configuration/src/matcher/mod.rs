//! URL pattern configuration.

mod destination;
mod path;

use http::Uri;
use serde::{Deserialize, Serialize};
use swkit::Matcher;

use crate::ConfigurationError;

pub use destination::{Destination, DestinationOperation};
pub use path::PathOperation;

// Standard externally-tagged enum (serde default)
// YAML syntax: Url: "...", Path: "...", Regex: "...", Destination: image, Navigation
/// Which requests a runtime-caching entry applies to.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub enum UrlPattern {
    /// One exact URL. A leading `/` resolves it against the origin.
    Url(String),
    /// Same-origin paths.
    Path(PathOperation),
    /// Regular expression over the full URL.
    Regex(String),
    /// Request destinations.
    Destination(DestinationOperation),
    /// Navigation requests.
    Navigation,
}

impl UrlPattern {
    /// Builds the matcher, resolving relative URLs against `origin`.
    pub fn into_matcher(self, origin: &str) -> Result<Matcher, ConfigurationError> {
        match self {
            UrlPattern::Url(url) => {
                let expected = resolve(origin, &url)?.to_string();
                Ok(Matcher::when(move |context| context.url.to_string() == expected))
            }
            UrlPattern::Path(operation) => operation.into_matcher(),
            UrlPattern::Regex(pattern) => Ok(Matcher::regex(&pattern)?),
            UrlPattern::Destination(operation) => operation.into_matcher(),
            UrlPattern::Navigation => Ok(Matcher::navigation()),
        }
    }
}

/// Resolves `url` against `origin` when it starts with `/`.
pub(crate) fn resolve(origin: &str, url: &str) -> Result<Uri, ConfigurationError> {
    let absolute = match url.strip_prefix('/') {
        Some(path) => format!("{}/{path}", origin.trim_end_matches('/')),
        None => url.to_owned(),
    };
    let uri: Uri = absolute
        .parse()
        .map_err(|error: http::uri::InvalidUri| ConfigurationError::InvalidUrl {
            url: url.to_owned(),
            reason: error.to_string(),
        })?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(ConfigurationError::InvalidUrl {
            url: url.to_owned(),
            reason: "URL must be absolute or start with '/'".to_owned(),
        });
    }
    Ok(uri)
}
