//! Cache keys, the on-disk envelope, and the durable store.
//!
//! Every cached collection is addressed by a `CacheKey` that binds the
//! resource, the optional server-side query, and the identity that fetched
//! it. The identity lives in the key on purpose: a fetch started under one
//! user that resolves after another user has logged in lands under the old
//! key and is never read by the new session.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

/// Entries older than this are refetched. Policy data changes slowly.
pub const CACHE_TTL_HOURS: i64 = 24;

/// On-disk envelope format version. Bump when the layout changes; entries
/// carrying a different version are treated as a miss.
const ENVELOPE_VERSION: u32 = 1;

/// Addresses one cached answer to a collection query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    resource: String,
    query: Option<String>,
    identity: String,
}

impl CacheKey {
    pub fn policies(query: Option<&str>, identity: &str) -> Self {
        Self {
            resource: "policies".to_string(),
            query: query.map(str::to_string),
            identity: identity.to_string(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// File name for the durable tier. Sanitized, so distinct keys can
    /// collide here; the envelope's embedded key disambiguates on load.
    pub fn file_name(&self) -> String {
        let mut slug = sanitize(&self.resource);
        if let Some(ref q) = self.query {
            slug.push('-');
            slug.push_str(&sanitize(q));
        }
        slug.push('-');
        slug.push_str(&sanitize(&self.identity));
        format!("{}.json", slug)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.resource,
            self.query.as_deref().unwrap_or(""),
            self.identity
        )
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// One cached collection, in memory and on disk (versioned envelope).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    #[serde(default)]
    version: u32,
    pub key: CacheKey,
    pub data: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(key: CacheKey, data: T) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            key,
            data,
            fetched_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    pub fn is_expired(&self) -> bool {
        self.age() >= Duration::hours(CACHE_TTL_HOURS)
    }

    /// An envelope read back from disk is usable only if the format version
    /// matches and it actually answers the requested key.
    pub fn is_valid_for(&self, key: &CacheKey) -> bool {
        self.version == ENVELOPE_VERSION && self.key == *key
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age().num_minutes();
        if minutes < 1 {
            // Covers clock skew too
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    #[cfg(test)]
    pub fn with_age(mut self, age: Duration) -> Self {
        self.fetched_at = Utc::now() - age;
        self
    }
}

/// Slim view of an envelope, enough to decide whose entry a file holds.
#[derive(Deserialize)]
struct EnvelopeHeader {
    key: CacheKey,
}

/// The durable tier: one JSON file per cache key under the cache directory.
pub struct DiskStore {
    cache_dir: PathBuf,
}

impl DiskStore {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.file_name())
    }

    pub fn load<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<CacheEntry<T>>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file {}", path.display()))?;
        let entry: CacheEntry<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file {}", path.display()))?;

        if entry.is_valid_for(key) {
            Ok(Some(entry))
        } else {
            debug!(key = %key, "durable entry has wrong version or key, treating as miss");
            Ok(None)
        }
    }

    pub fn save<T: Serialize>(&self, entry: &CacheEntry<T>) -> Result<()> {
        let path = self.entry_path(&entry.key);
        let contents = serde_json::to_string(entry)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write cache file {}", path.display()))?;
        Ok(())
    }

    pub fn delete(&self, key: &CacheKey) -> Result<()> {
        let path = self.entry_path(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete cache file {}", path.display()))?;
        }
        Ok(())
    }

    /// Remove every durable entry fetched under the given identity.
    /// Returns the number of files removed. Unreadable files are skipped.
    pub fn purge_identity(&self, identity: &str) -> Result<usize> {
        let mut removed = 0;
        let dir = std::fs::read_dir(&self.cache_dir)
            .with_context(|| format!("Failed to list cache directory {}", self.cache_dir.display()))?;

        for dir_entry in dir {
            let path = dir_entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let header = std::fs::read_to_string(&path)
                .ok()
                .and_then(|contents| serde_json::from_str::<EnvelopeHeader>(&contents).ok());
            let Some(header) = header else {
                debug!(path = %path.display(), "skipping unreadable cache file during purge");
                continue;
            };

            if header.key.identity() == identity {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to delete cache file {}", path.display()))?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, DiskStore) {
        let dir = TempDir::new().expect("temp dir");
        let store = DiskStore::new(dir.path().to_path_buf()).expect("store");
        (dir, store)
    }

    #[test]
    fn test_entry_expiry() {
        let key = CacheKey::policies(None, "alice");
        let fresh = CacheEntry::new(key.clone(), vec![1, 2, 3]);
        assert!(!fresh.is_expired());

        let almost = CacheEntry::new(key.clone(), vec![1]).with_age(Duration::hours(23));
        assert!(!almost.is_expired());

        let stale = CacheEntry::new(key, vec![1]).with_age(Duration::hours(25));
        assert!(stale.is_expired());
    }

    #[test]
    fn test_age_display() {
        let key = CacheKey::policies(None, "alice");
        assert_eq!(CacheEntry::new(key.clone(), 0).age_display(), "just now");
        assert_eq!(
            CacheEntry::new(key.clone(), 0)
                .with_age(Duration::minutes(5))
                .age_display(),
            "5m ago"
        );
        assert_eq!(
            CacheEntry::new(key.clone(), 0)
                .with_age(Duration::hours(3))
                .age_display(),
            "3h ago"
        );
        assert_eq!(
            CacheEntry::new(key, 0)
                .with_age(Duration::days(2))
                .age_display(),
            "2d ago"
        );
    }

    #[test]
    fn test_key_file_names_are_scoped() {
        let a = CacheKey::policies(Some("draft"), "alice@example.com");
        let b = CacheKey::policies(Some("draft"), "bob@example.com");
        let c = CacheKey::policies(None, "alice@example.com");
        assert_ne!(a.file_name(), b.file_name());
        assert_ne!(a.file_name(), c.file_name());
        assert!(a.file_name().ends_with(".json"));
    }

    #[test]
    fn test_disk_round_trip() {
        let (_dir, store) = store();
        let key = CacheKey::policies(Some("draft"), "alice");
        let entry = CacheEntry::new(key.clone(), vec!["P1".to_string()]);

        store.save(&entry).expect("save");
        let loaded: CacheEntry<Vec<String>> =
            store.load(&key).expect("load").expect("entry present");
        assert_eq!(loaded.data, entry.data);
        assert_eq!(loaded.fetched_at, entry.fetched_at);

        store.delete(&key).expect("delete");
        assert!(store.load::<Vec<String>>(&key).expect("load").is_none());
    }

    #[test]
    fn test_load_rejects_foreign_key_in_colliding_file() {
        let (_dir, store) = store();
        // "a.b" and "a_b" sanitize to the same file name
        let written = CacheKey::policies(None, "a.b");
        let requested = CacheKey::policies(None, "a_b");
        assert_eq!(written.file_name(), requested.file_name());

        store
            .save(&CacheEntry::new(written, vec![1]))
            .expect("save");
        assert!(store.load::<Vec<i32>>(&requested).expect("load").is_none());
    }

    #[test]
    fn test_load_rejects_unknown_envelope_version() {
        let (dir, store) = store();
        let key = CacheKey::policies(None, "alice");
        // Hand-written envelope without a version field (defaults to 0)
        let raw = serde_json::json!({
            "key": { "resource": "policies", "query": null, "identity": "alice" },
            "data": [1, 2],
            "fetched_at": Utc::now(),
        });
        std::fs::write(dir.path().join(key.file_name()), raw.to_string()).expect("write");

        assert!(store.load::<Vec<i32>>(&key).expect("load").is_none());
    }

    #[test]
    fn test_purge_identity_only_removes_matching_entries() {
        let (_dir, store) = store();
        let alice_all = CacheKey::policies(None, "alice");
        let alice_draft = CacheKey::policies(Some("draft"), "alice");
        let bob = CacheKey::policies(None, "bob");

        store.save(&CacheEntry::new(alice_all.clone(), vec![1])).expect("save");
        store.save(&CacheEntry::new(alice_draft.clone(), vec![2])).expect("save");
        store.save(&CacheEntry::new(bob.clone(), vec![3])).expect("save");

        let removed = store.purge_identity("alice").expect("purge");
        assert_eq!(removed, 2);

        assert!(store.load::<Vec<i32>>(&alice_all).expect("load").is_none());
        assert!(store.load::<Vec<i32>>(&alice_draft).expect("load").is_none());
        assert!(store.load::<Vec<i32>>(&bob).expect("load").is_some());
    }
}
