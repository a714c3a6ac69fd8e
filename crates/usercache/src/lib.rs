//! # usercache
//!
//! Read-through cache layer for the user catalog.
//!
//! ## Architecture
//! - **ShardedMap**: `id mod shards` RwLock shards over AHash maps, no eviction
//! - **UserCache**: cache probe, store fetch on miss, populate, count
//! - **FetchPolicy**: independent fetch per miss, or one in-flight fetch per id
//! - **LookupError**: the single failure taxonomy mapped to `(status, message)`

#![warn(missing_docs)]

mod cache;
mod error;
mod map;
mod stats;

pub use cache::{CacheConfig, FetchPolicy, UserCache, DEFAULT_SHARDS};
pub use error::LookupError;
pub use map::ShardedMap;
pub use stats::CacheStats;

pub use userdb::{User, UserId, UserSource, UserStore};
