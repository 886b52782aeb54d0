//! File-backed image store
//!
//! Maps an opaque cache key to `<cache-dir>/<key>.jpg` and exposes read,
//! write, delete, existence checks and streaming writes over that path.
//! There is no in-memory index, no TTL and no eviction: the filesystem is
//! the only source of truth.

mod error;
mod key;
mod store;

pub use error::{Result, StoreError};
pub use key::CacheKey;
pub use store::{ImageSink, ImageStore};
