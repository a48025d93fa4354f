//! Two-tier caching for policy collections.
//!
//! This module provides:
//! - `CacheManager`: answers collection queries from memory, then disk,
//!   then the network, respecting the 24-hour TTL and the session identity
//! - `DiskStore`: the durable tier, one JSON envelope file per key
//! - `CacheKey` / `CacheEntry`: identity-scoped keys and the versioned
//!   envelope shared by both tiers

pub mod manager;
pub mod store;

pub use manager::CacheManager;
pub use store::{CacheEntry, CacheKey, DiskStore, CACHE_TTL_HOURS};

/// Removal of all cached entries belonging to one identity.
///
/// Implemented by `CacheManager` and invoked by the session manager when a
/// logout clears that identity, so a later user can never observe a
/// predecessor's data.
pub trait IdentityPurge: Send + Sync {
    fn purge_identity(&self, identity: &str);
}
