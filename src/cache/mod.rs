//! Page response cache.
//!
//! The index page is cached for a short time under the `index_page` prefix.
//! Entries expire on their own; nothing invalidates them when posts change.
//!
//! ```toml
//! [cache]
//! enabled = true
//! index_ttl_seconds = 20
//! max_entries = 256
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::CacheConfig;
pub use keys::{ResponseKey, hash_value};
pub use middleware::{CacheState, response_cache_layer};
pub use store::{CachedResponse, ResponseStore};

pub const INDEX_PAGE_PREFIX: &str = "index_page";

pub const METRIC_NAMES: [&str; 3] = [store::METRIC_HIT, store::METRIC_MISS, store::METRIC_EVICT];
