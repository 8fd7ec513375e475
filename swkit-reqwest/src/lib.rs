#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod convert;
mod fetcher;

pub use fetcher::{ReqwestFetcher, ReqwestFetcherBuilder};

/// Re-export of the middleware trait accepted by [`ReqwestFetcherBuilder::middleware`].
pub use reqwest_middleware::Middleware;
