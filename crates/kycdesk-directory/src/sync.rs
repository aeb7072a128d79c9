//! Live directory mirror of the record store.
//!
//! One subscription per sync; every store change re-delivers the complete
//! normalized record set. Consumers observe the latest known complete
//! state through a watch channel; coalescing is fine, partial deltas are
//! not.

use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use kycdesk_core::{
    normalize_record, ConsoleError, ConsoleResult, RecordStore, RecordWatch, VerificationRecord,
};

/// A complete, self-consistent view of the directory at one point in time.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    records: Arc<Vec<VerificationRecord>>,
    revision: u64,
}

/// Aggregate verification counts over one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryStats {
    /// Records in the directory.
    pub total: usize,
    /// Records with every check verified.
    pub fully_verified: usize,
    /// Records with at least one check outstanding.
    pub pending: usize,
}

impl DirectorySnapshot {
    fn new(records: Vec<VerificationRecord>, revision: u64) -> Self {
        Self {
            records: Arc::new(records),
            revision,
        }
    }

    /// Records in this snapshot. Position is not stable across snapshots.
    #[must_use]
    pub fn records(&self) -> &[VerificationRecord] {
        &self.records
    }

    /// Delivery counter; `0` means nothing has been delivered yet.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a single record by owner id.
    #[must_use]
    pub fn find(&self, owner_id: &str) -> Option<&VerificationRecord> {
        self.records.iter().find(|record| record.owner_id == owner_id)
    }

    /// Records matching a case-insensitive search over names, email, and
    /// phone number.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<&VerificationRecord> {
        self.records
            .iter()
            .filter(|record| record.matches(term))
            .collect()
    }

    /// Aggregate verification counts.
    #[must_use]
    pub fn stats(&self) -> DirectoryStats {
        let fully_verified = self
            .records
            .iter()
            .filter(|record| record.flags.is_complete())
            .count();
        DirectoryStats {
            total: self.records.len(),
            fully_verified,
            pending: self.records.len() - fully_verified,
        }
    }
}

/// Owns the record-store subscription and republishes normalized snapshots.
pub struct DirectorySync {
    store: Arc<dyn RecordStore>,
    collection: String,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl DirectorySync {
    /// Creates a sync over one store collection. Nothing is subscribed
    /// until [`start`](Self::start).
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            pump: Mutex::new(None),
        }
    }

    /// Opens exactly one subscription and returns the snapshot feed.
    ///
    /// Starting an already-running sync is an invalid-state error.
    pub async fn start(&self) -> ConsoleResult<watch::Receiver<DirectorySnapshot>> {
        let mut pump = self.pump.lock().await;
        if pump.is_some() {
            return Err(ConsoleError::invalid_state(
                "directory sync is already running",
            ));
        }

        let record_watch = self.store.subscribe(&self.collection).await?;
        let (tx, rx) = watch::channel(DirectorySnapshot::default());
        let collection = self.collection.clone();
        *pump = Some(tokio::spawn(run_pump(record_watch, tx, collection)));
        Ok(rx)
    }

    /// Cancels the subscription and awaits the pump's termination, so no
    /// snapshot can be delivered after this returns. Idempotent; safe to
    /// call before `start`.
    pub async fn stop(&self) {
        let handle = self.pump.lock().await.take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
            info!("directory sync stopped");
        }
    }

    /// Returns `true` while a subscription is open.
    pub async fn is_running(&self) -> bool {
        self.pump.lock().await.is_some()
    }
}

async fn run_pump(
    mut record_watch: RecordWatch,
    tx: watch::Sender<DirectorySnapshot>,
    collection: String,
) {
    let mut revision = 0u64;
    while let Some(documents) = record_watch.snapshots.recv().await {
        revision += 1;
        let records: Vec<VerificationRecord> =
            documents.iter().map(normalize_record).collect();
        debug!(%collection, revision, records = records.len(), "snapshot delivered");
        if tx.send(DirectorySnapshot::new(records, revision)).is_err() {
            // Every consumer is gone; the subscription has no audience.
            break;
        }
    }
    // record_watch.guard drops here, cancelling the upstream subscription.
}

#[cfg(test)]
mod tests {
    use super::*;
    use kycdesk_core::VerificationFlags;

    fn record(owner_id: &str, first_name: &str, verified: u8) -> VerificationRecord {
        VerificationRecord {
            owner_id: owner_id.to_string(),
            first_name: Some(first_name.to_string()),
            flags: VerificationFlags {
                email_verified: verified >= 1,
                document_verified: verified >= 2,
                selfie_verified: verified >= 3,
                liveness_verified: verified >= 4,
            },
            ..VerificationRecord::default()
        }
    }

    fn snapshot() -> DirectorySnapshot {
        DirectorySnapshot::new(
            vec![
                record("u1", "Anita", 4),
                record("u2", "Bimala", 2),
                record("u3", "Chiran", 0),
            ],
            7,
        )
    }

    #[test]
    fn stats_partition_the_directory() {
        let stats = snapshot().stats();
        assert_eq!(
            stats,
            DirectoryStats {
                total: 3,
                fully_verified: 1,
                pending: 2,
            }
        );
    }

    #[test]
    fn find_and_search() {
        let snapshot = snapshot();
        assert_eq!(snapshot.revision(), 7);
        assert!(snapshot.find("u2").is_some());
        assert!(snapshot.find("u9").is_none());

        assert_eq!(snapshot.search("bimala").len(), 1);
        assert_eq!(snapshot.search("").len(), 3);
        assert!(snapshot.search("nobody").is_empty());
    }

    #[test]
    fn default_snapshot_is_the_pre_delivery_state() {
        let snapshot = DirectorySnapshot::default();
        assert_eq!(snapshot.revision(), 0);
        assert!(snapshot.is_empty());
    }
}
