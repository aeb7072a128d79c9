use thiserror::Error;

use crate::evidence::EvidenceCategory;

/// Canonical error type for console core operations.
///
/// Variants are cloneable so that results shared through a single-flight
/// cache resolution can be handed back to every waiting caller.
#[derive(Debug, Clone, Error)]
pub enum ConsoleError {
    /// Credentials were rejected by the identity provider.
    #[error("authentication failed: {reason}")]
    Authentication {
        /// Stable reason token (e.g. `"invalid-credentials"`).
        reason: String,
    },

    /// Principal authenticated but lacks administrator privilege.
    #[error("authorization failed: {reason}")]
    Authorization {
        /// Stable reason token (e.g. `"admin-only"`).
        reason: String,
    },

    /// Mutation request was malformed and rejected before any remote call.
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable explanation of the rejected input.
        message: String,
    },

    /// Entity was not found in the record store.
    #[error("{entity} `{id}` was not found")]
    NotFound {
        /// Entity type name (e.g. `"record"`).
        entity: &'static str,
        /// Identifier of the missing entity.
        id: String,
    },

    /// Record or blob store reported a transient failure.
    #[error("remote store unavailable: {message}")]
    RemoteUnavailable {
        /// Human-readable details from the failing client.
        message: String,
    },

    /// Operation violates current state machine rules.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Human-readable explanation of the invalid state.
        message: String,
    },

    /// Unexpected internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable details for debugging purposes.
        message: String,
    },
}

impl ConsoleError {
    /// Creates an `Authentication` variant.
    #[must_use]
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    /// The canonical rejection for bad credentials.
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self::authentication("invalid-credentials")
    }

    /// Creates an `Authorization` variant.
    #[must_use]
    pub fn authorization(reason: impl Into<String>) -> Self {
        Self::Authorization {
            reason: reason.into(),
        }
    }

    /// The canonical rejection for an authenticated non-administrator.
    #[must_use]
    pub fn admin_only() -> Self {
        Self::authorization("admin-only")
    }

    /// Creates a `Validation` variant.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a `NotFound` variant.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a `RemoteUnavailable` variant.
    #[must_use]
    pub fn remote_unavailable(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            message: message.into(),
        }
    }

    /// Creates an `InvalidState` variant.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Convenient result alias for console operations.
pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// Non-fatal cleanup failure surfaced while cascading a record deletion.
///
/// A warning never fails the overall deletion; it exists for operational
/// follow-up on evidence blobs that outlived their record.
#[derive(Debug, Clone)]
pub struct CleanupWarning {
    /// Owner whose evidence could not be fully removed.
    pub owner_id: String,
    /// Evidence category the failing blob belongs to.
    pub category: EvidenceCategory,
    /// Object key of the blob that survived the cascade.
    pub object: String,
    /// Failure details from the blob store.
    pub message: String,
}

/// Outcome of a record deletion, including best-effort cleanup warnings.
#[derive(Debug, Clone)]
pub struct DeletionReport {
    /// Owner of the deleted record.
    pub owner_id: String,
    /// Blobs that could not be deleted during the cascade.
    pub warnings: Vec<CleanupWarning>,
}

impl DeletionReport {
    /// Creates a report for the given owner.
    #[must_use]
    pub fn new(owner_id: impl Into<String>, warnings: Vec<CleanupWarning>) -> Self {
        Self {
            owner_id: owner_id.into(),
            warnings,
        }
    }

    /// Returns `true` when the cascade removed every evidence blob.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
