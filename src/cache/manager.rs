//! The cache-backed collection fetch path.
//!
//! `CacheManager` answers "give me the policies for query Q" by walking
//! memory tier → durable tier → network, in that order. It refuses to do
//! anything without an authenticated session, and every entry it creates is
//! keyed by the identity that was current when the request started.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::SessionManager;
use crate::models::Policy;

use super::store::{CacheEntry, CacheKey, DiskStore};
use super::IdentityPurge;

// ============================================================================
// Constants
// ============================================================================

/// Additional attempts after a failed collection fetch.
const FETCH_RETRIES: u32 = 2;

/// Fixed delay between fetch attempts.
const RETRY_DELAY: Duration = Duration::from_secs(1);

type MemoryTier = HashMap<CacheKey, CacheEntry<Vec<Policy>>>;

pub struct CacheManager {
    client: ApiClient,
    session: Arc<SessionManager>,
    memory: Mutex<MemoryTier>,
    disk: DiskStore,
}

impl CacheManager {
    pub fn new(client: ApiClient, session: Arc<SessionManager>, disk: DiskStore) -> Self {
        Self {
            client,
            session,
            memory: Mutex::new(HashMap::new()),
            disk,
        }
    }

    /// The lock is only ever held for map access, never across an await,
    /// so a poisoned lock just means a panic elsewhere; the map is still fine.
    fn memory(&self) -> MutexGuard<'_, MemoryTier> {
        self.memory.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the policy collection for `query`, cached where possible.
    ///
    /// Requires an authenticated session; returns `AuthRequired` otherwise
    /// without touching either tier or the network. Cached entries under a
    /// previous identity are left alone here - purging happens on logout.
    pub async fn get(&self, query: Option<&str>) -> Result<CacheEntry<Vec<Policy>>, ApiError> {
        let state = self.session.current();
        let Some(identity) = state.identity().map(str::to_string) else {
            return Err(ApiError::AuthRequired);
        };
        let key = CacheKey::policies(query, &identity);

        // Memory tier, expiry checked lazily on read
        if let Some(entry) = self.memory_get(&key) {
            debug!(key = %key, "memory cache hit");
            return Ok(entry);
        }

        // Durable tier
        match self.disk.load::<Vec<Policy>>(&key) {
            Ok(Some(entry)) if !entry.is_expired() => {
                debug!(key = %key, age = %entry.age_display(), "durable cache hit, promoting");
                self.memory().insert(key, entry.clone());
                return Ok(entry);
            }
            Ok(Some(_)) => {
                debug!(key = %key, "durable entry expired");
                if let Err(err) = self.disk.delete(&key) {
                    warn!(key = %key, error = %err, "failed to delete expired cache entry");
                }
            }
            Ok(None) => {}
            Err(err) => {
                // Storage errors are never fatal; fall through to the network
                warn!(key = %key, error = %err, "durable cache read failed");
            }
        }

        // Network
        let data = self.fetch_with_retry(query).await?;
        let entry = CacheEntry::new(key.clone(), data);

        if let Err(err) = self.disk.save(&entry) {
            warn!(key = %key, error = %err, "failed to write durable cache entry");
        }
        self.memory().insert(key, entry.clone());

        Ok(entry)
    }

    fn memory_get(&self, key: &CacheKey) -> Option<CacheEntry<Vec<Policy>>> {
        let mut memory = self.memory();
        match memory.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.clone()),
            Some(_) => {
                memory.remove(key);
                None
            }
            None => None,
        }
    }

    async fn fetch_with_retry(&self, query: Option<&str>) -> Result<Vec<Policy>, ApiError> {
        let mut attempt: u32 = 0;
        loop {
            match self.client.fetch_policies(query).await {
                Ok(data) => return Ok(data),
                Err(err) if attempt < FETCH_RETRIES => {
                    attempt += 1;
                    warn!(attempt, error = %err, "policy fetch failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl IdentityPurge for CacheManager {
    fn purge_identity(&self, identity: &str) {
        let mut memory = self.memory();
        memory.retain(|key, _| key.identity() != identity);
        drop(memory);

        match self.disk.purge_identity(identity) {
            Ok(removed) => debug!(identity, removed, "purged durable cache entries"),
            Err(err) => warn!(identity, error = %err, "failed to purge durable cache"),
        }
    }
}
