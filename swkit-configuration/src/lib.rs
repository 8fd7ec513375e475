#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod config;
mod error;
pub mod matcher;
pub mod runtime;
pub mod storage;

pub use config::{CacheNames, Config};
pub use error::ConfigurationError;
pub use matcher::UrlPattern;
pub use runtime::{Handler, RuntimeCaching, RuntimeOptions};
pub use storage::Storage;
