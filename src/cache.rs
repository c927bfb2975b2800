//! TTL-bounded result cache
//!
//! [`ResultCache`] maps a normalized URL to serialized [`PageMetadata`]. The
//! backing store is pluggable through [`CacheStore`]; [`MemoryStore`] is the
//! default process-local implementation.
//!
//! # Semantics
//!
//! - `get` returns `None` for missing and expired entries alike
//! - `put` overwrites unconditionally and resets the entry's age
//! - a hit never refreshes the entry

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metadata::PageMetadata;
use crate::url_shape::NormalizedUrl;
use crate::utils::errors::UnfurlResult;

/// Minimal key/value contract for a cache backing store
///
/// Implementations decide how `ttl` is enforced; a value must not be returned
/// once it is older than the `ttl` it was stored with.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> UnfurlResult<Option<String>>;

    async fn put(&self, key: &str, value: String, ttl: Duration) -> UnfurlResult<()>;
}

struct StoredValue {
    value: String,
    created_at: Instant,
    ttl: Duration,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) >= self.ttl
    }
}

/// Process-local store: volatile, lazily evicted on access
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| !stored.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Spawn a background task that purges expired entries every `interval`
    ///
    /// The task stops when `cancel_token` is cancelled.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = self.purge_expired();
                        if removed > 0 {
                            debug!("Cache sweep removed {} expired entries", removed);
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        info!("Cache sweeper cancelled");
                        break;
                    }
                }
            }
        })
    }
}

/// Cancel a sweeper started by [`MemoryStore::spawn_sweeper`] and wait for it
///
/// Returns false (and logs) if the task panicked or was aborted.
pub async fn stop_sweeper(cancel_token: &CancellationToken, handle: JoinHandle<()>) -> bool {
    cancel_token.cancel();
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Cache sweeper ended abnormally: {}", e);
            false
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> UnfurlResult<Option<String>> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(stored) if !stored.is_expired(now) => return Ok(Some(stored.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            // Re-check under the write lock so a concurrent fresh put survives
            self.entries
                .remove_if(key, |_, stored| stored.is_expired(Instant::now()));
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> UnfurlResult<()> {
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value,
                created_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }
}

/// Typed cache of resolved metadata keyed by normalized URL
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// In-process cache with the given TTL
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryStore::new()), ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached metadata for `url`, if present and younger than the TTL
    ///
    /// Store failures and undecodable values read as a miss.
    pub async fn get(&self, url: &NormalizedUrl) -> Option<PageMetadata> {
        let raw = match self.store.get(url.as_str()).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Cache lookup failed for {}: {}", url, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("Discarding undecodable cache entry for {}: {}", url, e);
                None
            }
        }
    }

    /// Store `metadata` for `url`, replacing any previous entry
    pub async fn put(&self, url: &NormalizedUrl, metadata: &PageMetadata) -> UnfurlResult<()> {
        let value = serde_json::to_string(metadata)?;
        self.store.put(url.as_str(), value, self.ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url_shape::normalize;

    const TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    fn sample(title: &str) -> PageMetadata {
        PageMetadata {
            title: Some(title.to_string()),
            domain: "example.com".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn put_then_get_returns_same_metadata() {
        let cache = ResultCache::in_memory(TTL);
        let url = normalize("example.com").unwrap();

        cache.put(&url, &sample("A")).await.unwrap();
        tokio::time::advance(TTL - Duration::from_secs(1)).await;

        assert_eq!(cache.get(&url).await, Some(sample("A")));
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let store = Arc::new(MemoryStore::new());
        let cache = ResultCache::new(store.clone(), TTL);
        let url = normalize("example.com").unwrap();

        cache.put(&url, &sample("A")).await.unwrap();
        tokio::time::advance(TTL + Duration::from_secs(1)).await;

        assert_eq!(cache.get(&url).await, None);
        assert!(store.is_empty(), "expired entry is evicted on access");
    }

    #[tokio::test(start_paused = true)]
    async fn put_overwrites_and_resets_age() {
        let cache = ResultCache::in_memory(TTL);
        let url = normalize("example.com").unwrap();

        cache.put(&url, &sample("old")).await.unwrap();
        tokio::time::advance(TTL - Duration::from_secs(10)).await;
        cache.put(&url, &sample("new")).await.unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;

        assert_eq!(cache.get(&url).await, Some(sample("new")));
    }

    #[tokio::test(start_paused = true)]
    async fn hit_does_not_refresh_entry() {
        let cache = ResultCache::in_memory(Duration::from_secs(100));
        let url = normalize("example.com").unwrap();

        cache.put(&url, &sample("A")).await.unwrap();
        tokio::time::advance(Duration::from_secs(90)).await;
        assert!(cache.get(&url).await.is_some());
        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(cache.get(&url).await.is_none());
    }

    #[tokio::test]
    async fn undecodable_value_reads_as_miss() {
        let store = Arc::new(MemoryStore::new());
        store.put("http://example.com", "not json".into(), TTL).await.unwrap();
        let cache = ResultCache::new(store, TTL);

        assert_eq!(cache.get(&normalize("example.com").unwrap()).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_expired_entries_until_cancelled() {
        let store = Arc::new(MemoryStore::new());
        store.put("a", "1".into(), Duration::from_secs(5)).await.unwrap();
        store.put("b", "2".into(), Duration::from_secs(500)).await.unwrap();

        let token = CancellationToken::new();
        let handle = Arc::clone(&store).spawn_sweeper(Duration::from_secs(10), token.clone());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(store.len(), 1);

        assert!(stop_sweeper(&token, handle).await);
    }

    #[tokio::test]
    async fn stopping_a_panicked_sweeper_reports_failure() {
        let token = CancellationToken::new();
        let handle = tokio::spawn(async {
            panic!("sweep failed");
        });

        assert!(!stop_sweeper(&token, handle).await);
        assert!(token.is_cancelled());
    }
}
