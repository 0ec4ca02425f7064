//! Time-bounded cache of group metadata.
//!
//! Sending a message to a group needs the group's participant list. The
//! session library asks this cache first and only goes to the network on a
//! miss. Entries are a hint: a stale entry is tolerated for up to one TTL,
//! and nothing treats the cache as the source of truth.
//!
//! # Concurrency note
//!
//! The cache is shared between the lifecycle manager (which populates it
//! from group listings) and the session library (which reads it while
//! sending). Clones share one map behind an async mutex; no lock is held
//! across network I/O.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use wabridge_protocol::GroupId;

/// Last-known metadata for a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMetadata {
    pub id: GroupId,
    /// Group title.
    pub subject: String,
    /// Participant count.
    pub size: usize,
    pub owner: Option<String>,
    pub description: Option<String>,
}

/// Cache limits.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry stays usable after it is stored.
    ///
    /// Default: 5 minutes. `Duration::ZERO` makes every entry a miss.
    pub ttl: Duration,

    /// Upper bound on stored entries. Inserting past it evicts expired
    /// entries first, then the oldest one.
    ///
    /// Default: 1024.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 1024,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    metadata: GroupMetadata,
    inserted_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    entries: HashMap<GroupId, CacheEntry>,
    config: CacheConfig,
}

impl CacheInner {
    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.inserted_at.elapsed() >= self.config.ttl
    }
}

/// Shared group metadata cache. Cloning is cheap and clones see the same
/// entries.
#[derive(Debug, Clone)]
pub struct GroupMetadataCache {
    inner: Arc<Mutex<CacheInner>>,
}

impl GroupMetadataCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: HashMap::new(),
                config,
            })),
        }
    }

    /// Returns the cached metadata, or `None` on a miss. An expired entry
    /// counts as a miss and is dropped.
    pub async fn get(&self, id: &GroupId) -> Option<GroupMetadata> {
        let mut inner = self.inner.lock().await;
        let expired = inner.entries.get(id).map(|entry| inner.is_expired(entry))?;
        if expired {
            inner.entries.remove(id);
            tracing::trace!(group = %id, "group metadata expired");
            return None;
        }
        inner.entries.get(id).map(|entry| entry.metadata.clone())
    }

    /// Stores metadata, replacing any previous entry for the same group.
    pub async fn insert(&self, metadata: GroupMetadata) {
        let mut inner = self.inner.lock().await;
        let max = inner.config.max_entries;
        if max == 0 {
            return;
        }

        if !inner.entries.contains_key(&metadata.id) && inner.entries.len() >= max {
            let ttl = inner.config.ttl;
            inner
                .entries
                .retain(|_, entry| entry.inserted_at.elapsed() < ttl);

            if inner.entries.len() >= max {
                let oldest = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(id, _)| id.clone());
                if let Some(oldest) = oldest {
                    inner.entries.remove(&oldest);
                }
            }
        }

        inner.entries.insert(
            metadata.id.clone(),
            CacheEntry {
                metadata,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drops every expired entry and returns their ids.
    pub async fn expire_stale(&self) -> Vec<GroupId> {
        let mut inner = self.inner.lock().await;
        let ttl = inner.config.ttl;
        let mut expired = Vec::new();
        inner.entries.retain(|id, entry| {
            if entry.inserted_at.elapsed() >= ttl {
                expired.push(id.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    /// Number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }
}

impl Default for GroupMetadataCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
