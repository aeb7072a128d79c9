//! Session-scoped cache of resolved evidence references.
//!
//! Keys are `(owner, category)`; values are the resolved URL sequences.
//! There is no TTL: entries are removed only by owner invalidation (record
//! deletion) or by clearing the whole cache (session teardown). Each
//! authorized session constructs its own instance so evidence URLs never
//! leak across sessions.

use futures::future::try_join_all;
use moka::future::Cache;
use std::sync::Arc;
use tracing::debug;

use kycdesk_core::{
    BlobStore, ConsoleError, ConsoleResult, ConsoleSettings, EvidenceCategory, EvidenceReference,
};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    owner_id: String,
    category: EvidenceCategory,
}

/// Memoizes resolved blob URLs per `(owner, category)`.
#[derive(Clone)]
pub struct FileReferenceCache {
    blobs: Arc<dyn BlobStore>,
    storage_root: String,
    entries: Cache<CacheKey, Arc<Vec<EvidenceReference>>>,
}

impl FileReferenceCache {
    /// Creates a cache bound to one blob store.
    #[must_use]
    pub fn new(blobs: Arc<dyn BlobStore>, settings: &ConsoleSettings) -> Self {
        let entries = Cache::builder()
            .max_capacity(settings.evidence_cache_capacity)
            .build();
        debug!(
            capacity = settings.evidence_cache_capacity,
            "evidence cache initialized"
        );
        Self {
            blobs,
            storage_root: settings.storage_root.clone(),
            entries,
        }
    }

    /// Returns the evidence references for one owner and category.
    ///
    /// A miss lists the blob prefix and resolves every object to an access
    /// URL; a hit returns the stored sequence with no remote call.
    /// Concurrent misses on the same key share a single in-flight
    /// resolution. A failed resolution is surfaced to every waiter and
    /// leaves the cache unmodified, so a retry can succeed.
    pub async fn get(
        &self,
        owner_id: &str,
        category: EvidenceCategory,
    ) -> ConsoleResult<Arc<Vec<EvidenceReference>>> {
        let key = CacheKey {
            owner_id: owner_id.to_string(),
            category,
        };
        let blobs = Arc::clone(&self.blobs);
        let prefix = category.prefix(&self.storage_root, owner_id);

        self.entries
            .try_get_with(key, async move {
                let handles = blobs.list_objects(&prefix).await?;
                let references = try_join_all(handles.iter().map(|handle| {
                    let blobs = Arc::clone(&blobs);
                    async move {
                        let url = blobs.access_url(handle).await?;
                        Ok::<_, ConsoleError>(EvidenceReference {
                            key: handle.key.clone(),
                            url,
                        })
                    }
                }))
                .await?;
                debug!(%prefix, resolved = references.len(), "evidence references resolved");
                Ok(Arc::new(references))
            })
            .await
            .map_err(|err: Arc<ConsoleError>| (*err).clone())
    }

    /// Removes every cached entry for one owner, across all categories.
    ///
    /// Sequenced inside record deletion before it reports success, so a
    /// stale reference can never be served for a deleted record.
    pub async fn invalidate_owner(&self, owner_id: &str) {
        for category in EvidenceCategory::ALL {
            self.entries
                .invalidate(&CacheKey {
                    owner_id: owner_id.to_string(),
                    category,
                })
                .await;
        }
        debug!(owner_id, "evidence cache invalidated");
    }

    /// Drops every entry; used at session teardown.
    pub async fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBlobStore;
    use bytes::Bytes;

    fn settings() -> ConsoleSettings {
        ConsoleSettings::default()
    }

    fn seeded_store() -> Arc<MemoryBlobStore> {
        let store = Arc::new(MemoryBlobStore::new());
        store.put_object("users/u1/document/passport.jpg", Bytes::from_static(b"p"));
        store.put_object("users/u1/document/visa.jpg", Bytes::from_static(b"v"));
        store.put_object("users/u1/selfie/front.jpg", Bytes::from_static(b"s"));
        store
    }

    #[tokio::test]
    async fn hit_skips_the_remote_store() {
        let store = seeded_store();
        let cache = FileReferenceCache::new(store.clone(), &settings());

        let first = cache.get("u1", EvidenceCategory::Document).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(store.list_calls(), 1);

        let second = cache.get("u1", EvidenceCategory::Document).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(store.list_calls(), 1);
    }

    #[tokio::test]
    async fn categories_are_cached_independently() {
        let store = seeded_store();
        let cache = FileReferenceCache::new(store.clone(), &settings());

        cache.get("u1", EvidenceCategory::Document).await.unwrap();
        let selfies = cache.get("u1", EvidenceCategory::Selfie).await.unwrap();
        assert_eq!(selfies.len(), 1);
        assert_eq!(store.list_calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_listing() {
        let store = seeded_store();
        let cache = FileReferenceCache::new(store.clone(), &settings());

        let (a, b) = tokio::join!(
            cache.get("u1", EvidenceCategory::Document),
            cache.get("u1", EvidenceCategory::Document),
        );
        assert_eq!(a.unwrap().len(), 2);
        assert_eq!(b.unwrap().len(), 2);
        assert_eq!(store.list_calls(), 1);
        // Both objects were resolved exactly once.
        assert_eq!(store.url_calls(), 2);
    }

    #[tokio::test]
    async fn failures_are_surfaced_and_never_cached() {
        let store = seeded_store();
        store.fail_listing("users/u1/document");
        let cache = FileReferenceCache::new(store.clone(), &settings());

        let err = cache.get("u1", EvidenceCategory::Document).await.unwrap_err();
        assert!(matches!(err, ConsoleError::RemoteUnavailable { .. }));

        // Once the transient condition clears, the retry succeeds.
        store.clear_failures();
        let references = cache.get("u1", EvidenceCategory::Document).await.unwrap();
        assert_eq!(references.len(), 2);
        assert_eq!(store.list_calls(), 2);
    }

    #[tokio::test]
    async fn owner_invalidation_forces_a_requery() {
        let store = seeded_store();
        let cache = FileReferenceCache::new(store.clone(), &settings());

        cache.get("u1", EvidenceCategory::Document).await.unwrap();
        cache.get("u1", EvidenceCategory::Selfie).await.unwrap();
        assert_eq!(store.list_calls(), 2);

        cache.invalidate_owner("u1").await;

        cache.get("u1", EvidenceCategory::Document).await.unwrap();
        cache.get("u1", EvidenceCategory::Selfie).await.unwrap();
        assert_eq!(store.list_calls(), 4);
    }
}
