//! Path pattern configuration.

use serde::{Deserialize, Serialize};
use swkit::Matcher;

use crate::ConfigurationError;

/// Path pattern operation.
///
/// Supports both a single path and a list of paths:
/// ```yaml
/// # Single path
/// - Path: "/api/items"
///
/// # Any of several paths
/// - Path:
///     in:
///       - "/api/v1/items"
///       - "/api/v2/items"
/// ```
///
/// Only same-origin requests match.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(untagged)]
pub enum PathOperation {
    /// Single path: `Path: "/api/items"`
    Pattern(String),
    /// Multiple paths: `Path: { in: [...] }`
    In {
        /// Accepted paths.
        r#in: Vec<String>,
    },
}

impl PathOperation {
    /// Builds the matcher.
    pub fn into_matcher(self) -> Result<Matcher, ConfigurationError> {
        match self {
            PathOperation::Pattern(path) => Ok(Matcher::path(path)),
            PathOperation::In { r#in: paths } if paths.is_empty() => {
                Err(ConfigurationError::EmptyPathList)
            }
            PathOperation::In { r#in: paths } => Ok(Matcher::when(move |context| {
                context.same_origin && paths.iter().any(|path| path == context.url.path())
            })),
        }
    }
}
