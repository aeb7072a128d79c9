//! In-memory record and blob store backends for testing.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use kycdesk_core::{
    ConsoleError, ConsoleResult, DocumentFields, ObjectHandle, RecordDocument, RecordStore,
    RecordWatch, SubscriptionGuard,
};

type CollectionMap = BTreeMap<String, BTreeMap<String, DocumentFields>>;

struct Subscriber {
    id: u64,
    collection: String,
    tx: mpsc::UnboundedSender<Vec<RecordDocument>>,
}

struct RecordStoreInner {
    collections: RwLock<CollectionMap>,
    subscribers: RwLock<Vec<Subscriber>>,
    next_subscriber: AtomicU64,
    update_calls: AtomicUsize,
    failing_reads: RwLock<HashSet<String>>,
}

/// In-memory record store (for testing).
///
/// Every mutation re-broadcasts the full document set of the touched
/// collection to its subscribers, mirroring the push behavior of the real
/// store.
#[derive(Clone)]
pub struct MemoryRecordStore {
    inner: Arc<RecordStoreInner>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RecordStoreInner {
                collections: RwLock::new(CollectionMap::new()),
                subscribers: RwLock::new(Vec::new()),
                next_subscriber: AtomicU64::new(0),
                update_calls: AtomicUsize::new(0),
                failing_reads: RwLock::new(HashSet::new()),
            }),
        }
    }

    /// Creates a document the way the intake flow would, stamping
    /// `createdAt` when absent, and notifies subscribers.
    pub fn insert_document(&self, collection: &str, id: &str, mut fields: DocumentFields) {
        fields
            .entry("createdAt".to_string())
            .or_insert_with(|| Utc::now().to_rfc3339().into());
        self.inner
            .collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        self.broadcast(collection);
    }

    /// Reads one document back, bypassing subscriptions.
    #[must_use]
    pub fn document(&self, collection: &str, id: &str) -> Option<DocumentFields> {
        self.inner
            .collections
            .read()
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned()
    }

    /// Number of `update_document` calls observed.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.inner.update_calls.load(Ordering::SeqCst)
    }

    /// Makes single-document reads of a collection fail, simulating a
    /// registry outage.
    pub fn fail_reads(&self, collection: &str) {
        self.inner
            .failing_reads
            .write()
            .insert(collection.to_string());
    }

    /// Clears injected failures.
    pub fn clear_failures(&self) {
        self.inner.failing_reads.write().clear();
    }

    fn snapshot(&self, collection: &str) -> Vec<RecordDocument> {
        self.inner
            .collections
            .read()
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, fields)| RecordDocument::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn broadcast(&self, collection: &str) {
        let snapshot = self.snapshot(collection);
        let mut subscribers = self.inner.subscribers.write();
        subscribers.retain(|subscriber| {
            subscriber.collection != collection || subscriber.tx.send(snapshot.clone()).is_ok()
        });
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn subscribe(&self, collection: &str) -> ConsoleResult<RecordWatch> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::SeqCst);

        // Initial snapshot first, then one delivery per change.
        tx.send(self.snapshot(collection))
            .map_err(|_| ConsoleError::internal("subscription receiver closed at open"))?;

        self.inner.subscribers.write().push(Subscriber {
            id,
            collection: collection.to_string(),
            tx,
        });

        let inner = Arc::clone(&self.inner);
        let guard = SubscriptionGuard::new(move || {
            inner
                .subscribers
                .write()
                .retain(|subscriber| subscriber.id != id);
        });

        Ok(RecordWatch {
            snapshots: rx,
            guard,
        })
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: DocumentFields,
    ) -> ConsoleResult<()> {
        self.inner.update_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut collections = self.inner.collections.write();
            let document = collections
                .get_mut(collection)
                .and_then(|documents| documents.get_mut(id))
                .ok_or_else(|| ConsoleError::not_found("record", id))?;
            for (key, value) in fields {
                document.insert(key, value);
            }
            document.insert("updatedAt".to_string(), Utc::now().to_rfc3339().into());
        }
        self.broadcast(collection);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> ConsoleResult<()> {
        {
            let mut collections = self.inner.collections.write();
            if let Some(documents) = collections.get_mut(collection) {
                documents.remove(id);
            }
        }
        self.broadcast(collection);
        Ok(())
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> ConsoleResult<Option<DocumentFields>> {
        if self.inner.failing_reads.read().contains(collection) {
            return Err(ConsoleError::remote_unavailable(format!(
                "collection `{collection}` is unreachable"
            )));
        }
        Ok(self.document(collection, id))
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: DocumentFields,
    ) -> ConsoleResult<()> {
        self.inner
            .collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        self.broadcast(collection);
        Ok(())
    }
}

struct BlobStoreInner {
    objects: RwLock<BTreeMap<String, Bytes>>,
    failing_listings: RwLock<HashSet<String>>,
    failing_deletions: RwLock<HashSet<String>>,
    list_calls: AtomicUsize,
    url_calls: AtomicUsize,
}

/// In-memory blob store (for testing), with failure injection for the
/// cascade-deletion and cache-retry paths.
#[derive(Clone)]
pub struct MemoryBlobStore {
    inner: Arc<BlobStoreInner>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BlobStoreInner {
                objects: RwLock::new(BTreeMap::new()),
                failing_listings: RwLock::new(HashSet::new()),
                failing_deletions: RwLock::new(HashSet::new()),
                list_calls: AtomicUsize::new(0),
                url_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Uploads an object the way the intake flow would.
    pub fn put_object(&self, key: &str, data: Bytes) {
        self.inner.objects.write().insert(key.to_string(), data);
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.objects.read().contains_key(key)
    }

    /// Number of `list_objects` calls observed.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.inner.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `access_url` calls observed.
    #[must_use]
    pub fn url_calls(&self) -> usize {
        self.inner.url_calls.load(Ordering::SeqCst)
    }

    /// Makes listings under a prefix fail.
    pub fn fail_listing(&self, prefix: &str) {
        self.inner
            .failing_listings
            .write()
            .insert(prefix.to_string());
    }

    /// Makes deletion of one object key fail.
    pub fn fail_deletion(&self, key: &str) {
        self.inner
            .failing_deletions
            .write()
            .insert(key.to_string());
    }

    /// Clears injected failures.
    pub fn clear_failures(&self) {
        self.inner.failing_listings.write().clear();
        self.inner.failing_deletions.write().clear();
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl kycdesk_core::BlobStore for MemoryBlobStore {
    async fn list_objects(&self, prefix: &str) -> ConsoleResult<Vec<ObjectHandle>> {
        self.inner.list_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .inner
            .failing_listings
            .read()
            .iter()
            .any(|failing| prefix.starts_with(failing.as_str()))
        {
            return Err(ConsoleError::remote_unavailable(format!(
                "listing `{prefix}` failed"
            )));
        }
        let objects = self.inner.objects.read();
        Ok(objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .map(ObjectHandle::new)
            .collect())
    }

    async fn access_url(&self, handle: &ObjectHandle) -> ConsoleResult<String> {
        self.inner.url_calls.fetch_add(1, Ordering::SeqCst);
        let objects = self.inner.objects.read();
        if !objects.contains_key(&handle.key) {
            return Err(ConsoleError::not_found("object", handle.key.clone()));
        }
        Ok(format!("memory://{}?expires=3600", handle.key))
    }

    async fn delete_object(&self, handle: &ObjectHandle) -> ConsoleResult<()> {
        if self.inner.failing_deletions.read().contains(&handle.key) {
            return Err(ConsoleError::remote_unavailable(format!(
                "deletion of `{}` failed",
                handle.key
            )));
        }
        self.inner.objects.write().remove(&handle.key);
        Ok(())
    }
}
