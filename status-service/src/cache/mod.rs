//! # Resource Cache
//!
//! Resource versions are immutable once published (only their
//! `nextVersionId` link changes), so parsed and checksum-verified bodies are
//! cached by `(collection_id, resource_id)`. Head resolution always goes to
//! the registry; nothing here answers "what is the current version".

use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use shared::{config::CacheConfig, types::StatusListPayload};

/// Cache manager for immutable resource payloads
pub struct CacheManager {
    payloads: Cache<String, Arc<StatusListPayload>>,

    enabled: bool,

    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheManager {
    /// Create a new CacheManager with the given configuration
    pub fn new(config: &CacheConfig) -> Self {
        info!(
            enabled = config.enabled,
            ttl = config.resource_ttl_secs,
            capacity = config.max_resources,
            "Initializing resource cache"
        );

        let payloads = Cache::builder()
            .max_capacity(config.max_resources)
            .time_to_live(Duration::from_secs(config.resource_ttl_secs))
            .build();

        Self {
            payloads,
            enabled: config.enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create a disabled cache (for testing or when caching is not wanted)
    pub fn disabled() -> Self {
        Self {
            payloads: Cache::builder().max_capacity(0).build(),
            enabled: false,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn key(collection_id: &str, resource_id: &str) -> String {
        format!("{collection_id}/{resource_id}")
    }

    /// Get a verified payload from cache
    pub async fn get_payload(
        &self,
        collection_id: &str,
        resource_id: &str,
    ) -> Option<Arc<StatusListPayload>> {
        if !self.enabled {
            return None;
        }

        let result = self.payloads.get(&Self::key(collection_id, resource_id)).await;
        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(
                collection_id = %collection_id,
                resource_id = %resource_id,
                "Resource cache hit"
            );
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Store a verified payload
    pub async fn put_payload(
        &self,
        collection_id: &str,
        resource_id: &str,
        payload: Arc<StatusListPayload>,
    ) {
        if !self.enabled {
            return;
        }
        self.payloads.insert(Self::key(collection_id, resource_id), payload).await;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.payloads.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            enabled: self.enabled,
        }
    }

    /// Clear the cache
    pub async fn clear_all(&self) {
        info!("Clearing resource cache");
        self.payloads.invalidate_all();
        self.payloads.run_pending_tasks().await;
    }
}

/// Cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub enabled: bool,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::types::{Encoding, PayloadMetadata, StatusList2021};

    fn payload() -> Arc<StatusListPayload> {
        Arc::new(StatusListPayload {
            status_list: StatusList2021 {
                encoded_list: "abc".into(),
                list_type: "RevocationList2021".into(),
                valid_from: Utc::now(),
            },
            metadata: PayloadMetadata {
                encoding: Encoding::Base64Url,
                encrypted: false,
                length: Some(8),
            },
        })
    }

    #[tokio::test]
    async fn test_payload_cache() {
        let cache = CacheManager::new(&CacheConfig::default());

        assert!(cache.get_payload("did:1", "r1").await.is_none());
        cache.put_payload("did:1", "r1", payload()).await;

        let cached = cache.get_payload("did:1", "r1").await;
        assert_eq!(cached.unwrap().status_list.encoded_list, "abc");
        assert!(cache.get_payload("did:2", "r1").await.is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);

        cache.clear_all().await;
        assert!(cache.get_payload("did:1", "r1").await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache() {
        let cache = CacheManager::disabled();
        cache.put_payload("did:1", "r1", payload()).await;
        assert!(cache.get_payload("did:1", "r1").await.is_none());
        assert_eq!(cache.stats().hit_rate(), 0.0);
    }
}
