//! Analysis result caching
//!
//! Results are addressed by [`CacheKey`]: a folder fingerprint plus a content
//! fingerprint. Two stores implement [`CacheStore`]:
//!
//! - [`MemoryCacheStore`]: moka-backed, bounded, optional TTL
//! - [`DiskCacheStore`]: JSON files with atomic replacement

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod disk;
mod error;
mod memory;
mod store;

pub use disk::DiskCacheStore;
pub use error::CacheError;
pub use memory::{CacheStats, MemoryCacheStore};
pub use store::{CacheKey, CacheStore};
