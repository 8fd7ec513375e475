use thiserror::Error;

/// Errors raised while parsing a configuration or compiling it into routes.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The YAML document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_saphyr::Error),

    /// A strategy or plugin option was rejected by the engine.
    #[error(transparent)]
    Invalid(#[from] swkit::ConfigError),

    /// A `Regex` URL pattern does not compile.
    #[error(transparent)]
    InvalidRegex(#[from] swkit::error::RouteError),

    /// A URL could not be parsed or resolved against the origin.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The HTTP method is not a valid token.
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    /// A `Path: { in: [...] }` pattern lists no paths.
    #[error("path pattern list must not be empty")]
    EmptyPathList,

    /// A `Destination: { in: [...] }` pattern lists no destinations.
    #[error("destination pattern list must not be empty")]
    EmptyDestinationList,

    /// Expiration needs a dedicated cache.
    #[error(
        "runtimeCaching[{index}]: when using cache expiration, \
         you must also configure a custom cacheName"
    )]
    CacheNameRequired {
        /// Position of the offending route.
        index: usize,
    },

    /// An option was set on a handler that does not support it.
    #[error("runtimeCaching[{index}]: '{option}' is not supported by {handler}")]
    UnsupportedOption {
        /// Position of the offending route.
        index: usize,
        /// Handler the route uses.
        handler: &'static str,
        /// The unsupported option.
        option: &'static str,
    },

    /// The storage section is inconsistent.
    #[error("invalid storage configuration: {0}")]
    InvalidStorage(&'static str),

    /// The storage backend was not compiled in.
    #[error("storage backend '{0}' is not available; enable the corresponding feature")]
    StorageNotAvailable(String),
}
