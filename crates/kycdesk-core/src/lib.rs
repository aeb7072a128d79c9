//! Core domain types and collaborator boundaries for the KycDesk
//! identity-verification console.

pub mod config;
pub mod error;
pub mod evidence;
pub mod normalize;
pub mod patch;
pub mod record;
pub mod traits;

pub use config::ConsoleSettings;
pub use error::{CleanupWarning, ConsoleError, ConsoleResult, DeletionReport};
pub use evidence::{EvidenceCategory, EvidenceReference, ObjectHandle};
pub use normalize::{canonical_date, canonical_instant, normalize_record};
pub use patch::RecordPatch;
pub use record::{
    DocumentFields, RecordDocument, VerificationCheck, VerificationFlags, VerificationRecord,
};
pub use traits::{
    BlobStore, IdentityProvider, Principal, RecordStore, RecordWatch, SubscriptionGuard,
};
