//! Facade binding the live feed, the evidence cache, and the mutation
//! service to one lifetime.
//!
//! A `Directory` exists only while a session is authorized; closing it
//! stops the sync and clears the cache as one logical operation.

use std::sync::Arc;
use tokio::sync::watch;

use kycdesk_core::{BlobStore, ConsoleResult, ConsoleSettings, RecordStore};

use crate::cache::FileReferenceCache;
use crate::service::DirectoryService;
use crate::sync::{DirectorySnapshot, DirectorySync};

/// The authorized view of the user directory.
pub struct Directory {
    sync: DirectorySync,
    feed: watch::Receiver<DirectorySnapshot>,
    service: DirectoryService,
}

impl Directory {
    /// Starts the live subscription and builds a fresh, session-scoped
    /// evidence cache.
    pub async fn open(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        settings: &ConsoleSettings,
    ) -> ConsoleResult<Self> {
        let sync = DirectorySync::new(Arc::clone(&records), settings.records_collection.clone());
        let feed = sync.start().await?;
        let cache = FileReferenceCache::new(Arc::clone(&blobs), settings);
        let service = DirectoryService::new(records, blobs, cache, settings);
        Ok(Self {
            sync,
            feed,
            service,
        })
    }

    /// A handle on the snapshot feed. Clones observe the same deliveries.
    #[must_use]
    pub fn feed(&self) -> watch::Receiver<DirectorySnapshot> {
        self.feed.clone()
    }

    /// The current snapshot without waiting for a change.
    #[must_use]
    pub fn current(&self) -> DirectorySnapshot {
        self.feed.borrow().clone()
    }

    /// Mutation operations (updates, verification toggles, deletion).
    #[must_use]
    pub fn service(&self) -> &DirectoryService {
        &self.service
    }

    /// The session's evidence cache.
    #[must_use]
    pub fn evidence(&self) -> &FileReferenceCache {
        self.service.evidence()
    }

    /// Stops the subscription and clears the cache. No snapshot can be
    /// delivered and no cached reference served after this returns.
    pub async fn close(&self) {
        self.sync.stop().await;
        self.evidence().clear().await;
    }
}
