//! In-memory identity provider for testing.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use kycdesk_core::{ConsoleError, ConsoleResult, IdentityProvider, Principal};

struct Account {
    uid: String,
    password: String,
}

struct IdentityInner {
    accounts: RwLock<BTreeMap<String, Account>>,
    current: RwLock<Option<Principal>>,
    sign_in_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
    next_uid: AtomicU64,
}

/// In-memory identity provider (for testing).
///
/// Counts sign-in/sign-out calls so tests can assert that revocation
/// happens exactly once.
#[derive(Clone)]
pub struct MemoryIdentityProvider {
    inner: Arc<IdentityInner>,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(IdentityInner {
                accounts: RwLock::new(BTreeMap::new()),
                current: RwLock::new(None),
                sign_in_calls: AtomicUsize::new(0),
                sign_out_calls: AtomicUsize::new(0),
                next_uid: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a credential with a fixed uid.
    pub fn register(&self, email: &str, password: &str, uid: &str) {
        self.inner.accounts.write().insert(
            email.to_string(),
            Account {
                uid: uid.to_string(),
                password: password.to_string(),
            },
        );
    }

    /// Plants an ambient session, as if a credential survived a reload.
    pub fn seed_session(&self, principal: Principal) {
        *self.inner.current.write() = Some(principal);
    }

    /// The currently signed-in principal, if any.
    #[must_use]
    pub fn current_principal(&self) -> Option<Principal> {
        self.inner.current.read().clone()
    }

    #[must_use]
    pub fn sign_in_calls(&self) -> usize {
        self.inner.sign_in_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.inner.sign_out_calls.load(Ordering::SeqCst)
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> ConsoleResult<Principal> {
        self.inner.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        let accounts = self.inner.accounts.read();
        let account = accounts
            .get(email)
            .filter(|account| account.password == password)
            .ok_or_else(ConsoleError::invalid_credentials)?;
        let principal = Principal {
            uid: account.uid.clone(),
            email: email.to_string(),
        };
        drop(accounts);
        *self.inner.current.write() = Some(principal.clone());
        Ok(principal)
    }

    async fn sign_out(&self) -> ConsoleResult<()> {
        self.inner.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.inner.current.write() = None;
        Ok(())
    }

    async fn create_user(&self, email: &str, password: &str) -> ConsoleResult<Principal> {
        let mut accounts = self.inner.accounts.write();
        if accounts.contains_key(email) {
            return Err(ConsoleError::validation(format!(
                "account `{email}` already exists"
            )));
        }
        let uid = format!("uid-{}", self.inner.next_uid.fetch_add(1, Ordering::SeqCst));
        accounts.insert(
            email.to_string(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );
        let principal = Principal {
            uid,
            email: email.to_string(),
        };
        drop(accounts);
        // Provisioning signs the new identity in, like the real provider.
        *self.inner.current.write() = Some(principal.clone());
        Ok(principal)
    }

    async fn current_session(&self) -> ConsoleResult<Option<Principal>> {
        Ok(self.inner.current.read().clone())
    }
}
