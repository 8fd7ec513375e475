//! Destination pattern configuration.

use serde::{Deserialize, Serialize};
use swkit::{Matcher, RequestDestination};

use crate::ConfigurationError;

/// Request destination, as named by the Fetch standard.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// `fetch()` calls from script.
    Empty,
    /// Documents.
    Document,
    /// Images.
    Image,
    /// Scripts.
    Script,
    /// Stylesheets.
    Style,
    /// Fonts.
    Font,
}

impl From<Destination> for RequestDestination {
    fn from(destination: Destination) -> Self {
        match destination {
            Destination::Empty => RequestDestination::Empty,
            Destination::Document => RequestDestination::Document,
            Destination::Image => RequestDestination::Image,
            Destination::Script => RequestDestination::Script,
            Destination::Style => RequestDestination::Style,
            Destination::Font => RequestDestination::Font,
        }
    }
}

/// Destination pattern operation.
///
/// ```yaml
/// - Destination: image
/// - Destination:
///     in: [script, style]
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(untagged)]
pub enum DestinationOperation {
    /// Single destination.
    One(Destination),
    /// Any of several destinations.
    In {
        /// Accepted destinations.
        r#in: Vec<Destination>,
    },
}

impl DestinationOperation {
    /// Builds the matcher.
    pub fn into_matcher(self) -> Result<Matcher, ConfigurationError> {
        let destinations: Vec<RequestDestination> = match self {
            DestinationOperation::One(destination) => {
                return Ok(Matcher::destination(destination.into()));
            }
            DestinationOperation::In { r#in: destinations } => {
                destinations.into_iter().map(Into::into).collect()
            }
        };
        if destinations.is_empty() {
            return Err(ConfigurationError::EmptyDestinationList);
        }
        Ok(Matcher::when(move |context| {
            destinations.contains(context.request.destination())
        }))
    }
}
