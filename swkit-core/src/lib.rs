#![warn(missing_docs)]
//! # swkit-core
//!
//! Platform primitives for the swkit service-worker caching toolkit.
//!
//! The caching engine in the `swkit` crate is written against the traits and
//! types defined here, so it never depends on a concrete transport or storage:
//!
//! - [`Request`] and [`Response`] model fetch messages with buffered bodies
//! - [`Cache`] and [`CacheStorage`] model named, origin-scoped response caches
//! - [`Fetch`] performs network requests
//! - [`FetchEvent`] carries an intercepted request and its pending work
//! - [`ExtendLifetime`] tracks spawned work an owner must wait for
//!
//! Storage backends (`swkit-moka`) and fetchers (`swkit-reqwest`) implement
//! these traits.

pub mod cache;
pub mod error;
pub mod event;
pub mod fetch;
pub mod lifetime;
pub mod request;
pub mod response;

pub use cache::{
    Cache, CacheQueryOptions, CacheResult, CacheStorage, MultiCacheQueryOptions, request_matches,
};
pub use error::{BoxError, CacheError, FetchError, SharedError};
pub use event::{FetchEvent, FetchEventBuilder};
pub use fetch::{CacheMode, Credentials, Fetch, FetchOptions, FetchResult, Redirect};
pub use lifetime::ExtendLifetime;
pub use request::{Request, RequestDestination, RequestMode};
pub use response::{Response, ResponseType};
