//! Administrator-driven record mutation and deletion.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use kycdesk_core::{
    BlobStore, CleanupWarning, ConsoleError, ConsoleResult, ConsoleSettings, DeletionReport,
    EvidenceCategory, RecordPatch, RecordStore, VerificationCheck,
};

use crate::cache::FileReferenceCache;

/// Forwards administrator mutations to the record store and keeps the
/// evidence cache coherent with deletions.
pub struct DirectoryService {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    cache: FileReferenceCache,
    collection: String,
    storage_root: String,
}

impl DirectoryService {
    #[must_use]
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        cache: FileReferenceCache,
        settings: &ConsoleSettings,
    ) -> Self {
        Self {
            records,
            blobs,
            cache,
            collection: settings.records_collection.clone(),
            storage_root: settings.storage_root.clone(),
        }
    }

    /// Applies a partial update to one record.
    ///
    /// Only explicitly provided fields are forwarded; omission leaves the
    /// store value unchanged. Contact fields are immutable through this
    /// path and are silently dropped (the intake flow owns them); a patch
    /// left empty by the drop is a successful no-op.
    pub async fn update_record(&self, owner_id: &str, patch: RecordPatch) -> ConsoleResult<()> {
        if owner_id.trim().is_empty() {
            return Err(ConsoleError::validation("owner id cannot be empty"));
        }
        if patch.is_empty() {
            return Err(ConsoleError::validation("update carries no fields"));
        }
        patch.validate_dates()?;

        let (patch, dropped) = patch.without_contact_fields();
        if dropped {
            warn!(owner_id, "immutable contact fields dropped from update");
        }
        let fields = patch.to_document();
        if fields.is_empty() {
            debug!(owner_id, "nothing updatable remained; skipping remote call");
            return Ok(());
        }

        self.records
            .update_document(&self.collection, owner_id, fields)
            .await
    }

    /// Flips a single verification check, the admin console's manual
    /// verification action.
    pub async fn set_verification(
        &self,
        owner_id: &str,
        check: VerificationCheck,
        verified: bool,
    ) -> ConsoleResult<()> {
        info!(owner_id, check = check.as_str(), verified, "verification updated");
        self.update_record(owner_id, RecordPatch::verification(check, verified))
            .await
    }

    /// Deletes a record and cascades to its evidence blobs.
    ///
    /// Success is defined solely by the store deletion; blob cleanup is
    /// best-effort. A category whose listing fails contributes zero items;
    /// an individual blob that cannot be deleted becomes a
    /// [`CleanupWarning`] in the report. The owner's cache entries are
    /// invalidated before this returns.
    pub async fn delete_record(&self, owner_id: &str) -> ConsoleResult<DeletionReport> {
        if owner_id.trim().is_empty() {
            return Err(ConsoleError::validation("owner id cannot be empty"));
        }

        self.records
            .delete_document(&self.collection, owner_id)
            .await?;

        let mut warnings = Vec::new();
        for category in EvidenceCategory::ALL {
            let prefix = category.prefix(&self.storage_root, owner_id);
            let handles = match self.blobs.list_objects(&prefix).await {
                Ok(handles) => handles,
                Err(err) => {
                    debug!(%err, %prefix, "no evidence listed for category");
                    continue;
                }
            };

            let results =
                join_all(handles.iter().map(|handle| self.blobs.delete_object(handle))).await;
            for (handle, result) in handles.iter().zip(results) {
                if let Err(err) = result {
                    warn!(%err, object = %handle.key, "evidence blob could not be deleted");
                    warnings.push(CleanupWarning {
                        owner_id: owner_id.to_string(),
                        category,
                        object: handle.key.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        self.cache.invalidate_owner(owner_id).await;
        info!(owner_id, warnings = warnings.len(), "record deleted");
        Ok(DeletionReport::new(owner_id, warnings))
    }

    /// The evidence cache this service keeps coherent.
    #[must_use]
    pub fn evidence(&self) -> &FileReferenceCache {
        &self.cache
    }
}
