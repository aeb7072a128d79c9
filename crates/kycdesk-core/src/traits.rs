//! External collaborator boundaries.
//!
//! The record store, blob store, and identity provider are remote systems;
//! this core only ever talks to them through these traits. In-memory
//! implementations live in `kycdesk-directory` and `kycdesk-console`.

use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

use crate::error::ConsoleResult;
use crate::evidence::ObjectHandle;
use crate::record::{DocumentFields, RecordDocument};

/// Cancellation handle for a store subscription.
///
/// Dropping the guard (or calling [`cancel`](Self::cancel)) tells the store
/// to stop delivering snapshots. Late deliveries already queued may still
/// sit in the channel; consumers gate on their own lifecycle for the
/// no-delivery-after-stop guarantee.
pub struct SubscriptionGuard {
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionGuard {
    /// Wraps a cancellation action.
    #[must_use]
    pub fn new(on_cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// A guard with nothing to cancel.
    #[must_use]
    pub fn noop() -> Self {
        Self { on_cancel: None }
    }

    /// Cancels the subscription explicitly.
    pub fn cancel(mut self) {
        if let Some(on_cancel) = self.on_cancel.take() {
            on_cancel();
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(on_cancel) = self.on_cancel.take() {
            on_cancel();
        }
    }
}

impl fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("armed", &self.on_cancel.is_some())
            .finish()
    }
}

/// Live change feed from the record store.
///
/// The store delivers the *full current document set* on every change, in
/// the order changes were observed; no deltas.
#[derive(Debug)]
pub struct RecordWatch {
    /// Full-snapshot deliveries, one per observed change.
    pub snapshots: mpsc::UnboundedReceiver<Vec<RecordDocument>>,
    /// Cancels delivery when dropped.
    pub guard: SubscriptionGuard,
}

/// The external system of record for verification documents.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Opens a change subscription on a collection. The current snapshot is
    /// delivered immediately, then again on every change of any document.
    async fn subscribe(&self, collection: &str) -> ConsoleResult<RecordWatch>;

    /// Merges the given fields into an existing document.
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: DocumentFields,
    ) -> ConsoleResult<()>;

    /// Deletes a document. Deleting an absent document is not an error.
    async fn delete_document(&self, collection: &str, id: &str) -> ConsoleResult<()>;

    /// Reads a single document, used for registry lookups.
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> ConsoleResult<Option<DocumentFields>>;

    /// Creates or replaces a single document, used for registry writes.
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: DocumentFields,
    ) -> ConsoleResult<()>;
}

/// The external system holding uploaded evidence files.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Lists every object under a path prefix.
    async fn list_objects(&self, prefix: &str) -> ConsoleResult<Vec<ObjectHandle>>;

    /// Issues a time-limited access URL for one object.
    async fn access_url(&self, handle: &ObjectHandle) -> ConsoleResult<String>;

    /// Deletes one object.
    async fn delete_object(&self, handle: &ObjectHandle) -> ConsoleResult<()>;
}

/// An authenticated identity attempting to use the console.
///
/// Holding a `Principal` proves authentication only; administrator
/// privilege is confirmed separately against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable identifier assigned by the identity provider.
    pub uid: String,
    /// Email the principal authenticated with.
    pub email: String,
}

/// The external authentication provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticates with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> ConsoleResult<Principal>;

    /// Revokes the current session. Idempotent.
    async fn sign_out(&self) -> ConsoleResult<()>;

    /// Provisions a new identity and signs it in.
    async fn create_user(&self, email: &str, password: &str) -> ConsoleResult<Principal>;

    /// Returns the ambient session restored from an existing credential,
    /// if any (e.g. on application reload).
    async fn current_session(&self) -> ConsoleResult<Option<Principal>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn guard_cancels_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));

        let counted = Arc::clone(&calls);
        let guard = SubscriptionGuard::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });
        guard.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counted = Arc::clone(&calls);
        let guard = SubscriptionGuard::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });
        drop(guard);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        SubscriptionGuard::noop().cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
