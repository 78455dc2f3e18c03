//! Ephemeral value caching.
//!
//! # Design Decisions
//! - Per-entry TTL; expiry is checked lazily on read, there is no sweeper
//! - No size bound or LRU eviction; callers `delete`/`clear` as needed
//! - Single-writer: reads may evict, so every lookup takes `&mut self`

pub mod ttl;

pub use ttl::TtlCache;
