#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
pub mod metrics;
mod storage;

pub use builder::{ByteCapacity, EntryCapacity, MokaCacheStorageBuilder, NoCapacity};
pub use moka::policy::EvictionPolicy;
pub use storage::{MokaCache, MokaCacheStorage};
