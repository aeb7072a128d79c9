//! Admin authorization gate.
//!
//! Authentication alone is never enough to see the directory: the
//! principal's privilege flag must be positively confirmed in the
//! administrator registry first. The window between the two checks is a
//! named state (`PrivilegeCheckPending`), and a principal that fails the
//! check is revoked before the failure is reported, so an
//! authenticated-but-unprivileged session never persists.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use kycdesk_core::{
    BlobStore, ConsoleError, ConsoleResult, ConsoleSettings, DocumentFields, IdentityProvider,
    Principal, RecordStore,
};
use kycdesk_directory::Directory;

use crate::session::AdminSession;

/// Registry field that must be `true` for a principal to pass the gate.
const ADMIN_FLAG_FIELD: &str = "isAdmin";

/// Authorization lifecycle of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No principal; the resting state.
    Unauthenticated,
    /// Credentials are with the identity provider.
    Authenticating,
    /// Authenticated; privilege not yet confirmed. No directory state may
    /// be exposed here.
    PrivilegeCheckPending,
    /// Privilege confirmed; the directory session is live.
    Authorized,
    /// Privilege was checked and refused; the session was revoked.
    Denied,
}

impl GateState {
    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::PrivilegeCheckPending => "privilege-check-pending",
            Self::Authorized => "authorized",
            Self::Denied => "denied",
        }
    }
}

struct GateInner {
    state: GateState,
    session: Option<Arc<AdminSession>>,
}

/// Confirms administrator privilege before exposing the directory, and
/// owns the directory session's lifetime.
pub struct AdminGate {
    identity: Arc<dyn IdentityProvider>,
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    settings: ConsoleSettings,
    inner: Mutex<GateInner>,
}

impl AdminGate {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        settings: ConsoleSettings,
    ) -> Self {
        Self {
            identity,
            records,
            blobs,
            settings,
            inner: Mutex::new(GateInner {
                state: GateState::Unauthenticated,
                session: None,
            }),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> GateState {
        self.inner.lock().await.state
    }

    /// The live session, present only in [`GateState::Authorized`].
    pub async fn session(&self) -> Option<Arc<AdminSession>> {
        self.inner.lock().await.session.clone()
    }

    /// Authenticates and authorizes a fresh login.
    ///
    /// Credential rejection surfaces as an authentication error with the
    /// gate back at `Unauthenticated`. A principal whose privilege flag is
    /// absent or false is signed out (exactly once) before the
    /// authorization error is reported.
    pub async fn login(&self, email: &str, password: &str) -> ConsoleResult<Arc<AdminSession>> {
        let mut inner = self.inner.lock().await;
        if inner.state == GateState::Authorized {
            return Err(ConsoleError::invalid_state(
                "a session is already authorized",
            ));
        }

        inner.state = GateState::Authenticating;
        let principal = match self.identity.sign_in(email, password).await {
            Ok(principal) => principal,
            Err(err) => {
                warn!(%err, "sign-in rejected");
                inner.state = GateState::Unauthenticated;
                return Err(err);
            }
        };

        self.authorize(&mut inner, principal).await
    }

    /// Runs the privilege check for an ambient session restored from an
    /// existing credential (application reload).
    ///
    /// A restored session that fails the check is revoked identically to a
    /// fresh login failure. Returns `None` when no ambient session exists.
    pub async fn restore(&self) -> ConsoleResult<Option<Arc<AdminSession>>> {
        let mut inner = self.inner.lock().await;
        if inner.state == GateState::Authorized {
            return Ok(inner.session.clone());
        }

        let Some(principal) = self.identity.current_session().await? else {
            inner.state = GateState::Unauthenticated;
            return Ok(None);
        };

        self.authorize(&mut inner, principal).await.map(Some)
    }

    /// Revokes the session: stops the directory sync, clears the evidence
    /// cache, and signs out, as one logical operation.
    pub async fn logout(&self) -> ConsoleResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(session) = inner.session.take() {
            session.close().await;
        }
        inner.state = GateState::Unauthenticated;
        self.identity.sign_out().await?;
        info!("session revoked");
        Ok(())
    }

    /// Provisions a new administrator: creates the identity and writes its
    /// registry entry.
    pub async fn create_admin(&self, email: &str, password: &str) -> ConsoleResult<Principal> {
        let principal = self.identity.create_user(email, password).await?;

        let mut entry = DocumentFields::new();
        entry.insert("email".to_string(), Value::String(email.to_string()));
        entry.insert(ADMIN_FLAG_FIELD.to_string(), Value::Bool(true));
        entry.insert(
            "createdAt".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        self.records
            .set_document(&self.settings.admin_registry, &principal.uid, entry)
            .await?;

        info!(uid = %principal.uid, "administrator provisioned");
        Ok(principal)
    }

    /// The privilege check shared by `login` and `restore`. The gate lock
    /// is held throughout, so no caller can observe directory state while
    /// the check is pending.
    async fn authorize(
        &self,
        inner: &mut GateInner,
        principal: Principal,
    ) -> ConsoleResult<Arc<AdminSession>> {
        inner.state = GateState::PrivilegeCheckPending;

        let entry = match self
            .records
            .get_document(&self.settings.admin_registry, &principal.uid)
            .await
        {
            Ok(entry) => entry,
            Err(err) => {
                // Privilege is never assumed: an unverifiable principal is
                // revoked like an unprivileged one.
                warn!(%err, uid = %principal.uid, "registry lookup failed");
                self.revoke(inner, GateState::Unauthenticated).await;
                return Err(err);
            }
        };

        if !is_admin(entry.as_ref()) {
            warn!(uid = %principal.uid, "principal is not an administrator");
            self.revoke(inner, GateState::Denied).await;
            return Err(ConsoleError::admin_only());
        }

        let directory = match Directory::open(
            Arc::clone(&self.records),
            Arc::clone(&self.blobs),
            &self.settings,
        )
        .await
        {
            Ok(directory) => directory,
            Err(err) => {
                self.revoke(inner, GateState::Unauthenticated).await;
                return Err(err);
            }
        };

        info!(uid = %principal.uid, "administrator authorized");
        let session = Arc::new(AdminSession::new(principal, directory));
        inner.session = Some(Arc::clone(&session));
        inner.state = GateState::Authorized;
        Ok(session)
    }

    async fn revoke(&self, inner: &mut GateInner, next: GateState) {
        if let Err(err) = self.identity.sign_out().await {
            warn!(%err, "sign-out during revocation failed");
        }
        inner.session = None;
        inner.state = next;
    }
}

fn is_admin(entry: Option<&DocumentFields>) -> bool {
    entry
        .and_then(|fields| fields.get(ADMIN_FLAG_FIELD))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
