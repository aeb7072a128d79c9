//! Verification record domain model.
//!
//! Records are created by the intake flow and mirrored here read-mostly;
//! administrators only ever flip verification flags and edit profile
//! fields. Wire field names are the store's camelCase convention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Raw field map of one store document.
pub type DocumentFields = serde_json::Map<String, Value>;

/// One document as delivered by the record store, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDocument {
    /// Store-assigned stable identifier.
    pub id: String,
    /// Raw document fields in the store's native encoding.
    pub fields: DocumentFields,
}

impl RecordDocument {
    /// Creates a document from an identifier and raw fields.
    #[must_use]
    pub fn new(id: impl Into<String>, fields: DocumentFields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// The four independent verification checks tracked per record.
///
/// A flag missing from the store document deserializes to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationFlags {
    #[serde(rename = "isEmailVerified")]
    pub email_verified: bool,
    #[serde(rename = "isDocumentVerified")]
    pub document_verified: bool,
    #[serde(rename = "isSelfieVerified")]
    pub selfie_verified: bool,
    #[serde(rename = "isLivenessVerified")]
    pub liveness_verified: bool,
}

impl VerificationFlags {
    /// Number of checks currently verified.
    #[must_use]
    pub fn verified_count(&self) -> u8 {
        [
            self.email_verified,
            self.document_verified,
            self.selfie_verified,
            self.liveness_verified,
        ]
        .into_iter()
        .filter(|flag| *flag)
        .count() as u8
    }

    /// Completion percentage in `[0, 100]`, `25` per verified check.
    ///
    /// No rounding is performed; display rounding is the caller's choice.
    #[must_use]
    pub fn progress(&self) -> f64 {
        f64::from(self.verified_count()) * 25.0
    }

    /// Returns `true` when every check has been verified.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.verified_count() == 4
    }

    /// Reads one check.
    #[must_use]
    pub fn get(&self, check: VerificationCheck) -> bool {
        match check {
            VerificationCheck::Email => self.email_verified,
            VerificationCheck::Document => self.document_verified,
            VerificationCheck::Selfie => self.selfie_verified,
            VerificationCheck::Liveness => self.liveness_verified,
        }
    }

    /// Sets one check.
    pub fn set(&mut self, check: VerificationCheck, verified: bool) {
        match check {
            VerificationCheck::Email => self.email_verified = verified,
            VerificationCheck::Document => self.document_verified = verified,
            VerificationCheck::Selfie => self.selfie_verified = verified,
            VerificationCheck::Liveness => self.liveness_verified = verified,
        }
    }
}

/// Identifies one of the four verification checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationCheck {
    Email,
    Document,
    Selfie,
    Liveness,
}

impl VerificationCheck {
    /// Every check, in display order.
    pub const ALL: [Self; 4] = [Self::Email, Self::Document, Self::Selfie, Self::Liveness];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Document => "document",
            Self::Selfie => "selfie",
            Self::Liveness => "liveness",
        }
    }

    /// Returns the store field this check is persisted under.
    #[must_use]
    pub const fn field_name(&self) -> &'static str {
        match self {
            Self::Email => "isEmailVerified",
            Self::Document => "isDocumentVerified",
            Self::Selfie => "isSelfieVerified",
            Self::Liveness => "isLivenessVerified",
        }
    }
}

impl FromStr for VerificationCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "document" => Ok(Self::Document),
            "selfie" => Ok(Self::Selfie),
            "liveness" => Ok(Self::Liveness),
            _ => Err(format!("invalid verification check: {s}")),
        }
    }
}

/// One end-user verification record, normalized for the console.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationRecord {
    /// Stable primary key assigned by the record store.
    #[serde(rename = "uid")]
    pub owner_id: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub father_name: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub citizenship_number: Option<String>,
    pub license_number: Option<String>,

    /// Date of birth, canonical `YYYY-MM-DD` where the store value allowed it.
    pub dob: Option<String>,
    /// Identification document issue date, canonical `YYYY-MM-DD`.
    pub id_issue_date: Option<String>,
    /// Identification document expiry date, canonical `YYYY-MM-DD`.
    pub id_expiry_date: Option<String>,

    #[serde(flatten)]
    pub flags: VerificationFlags,

    /// Set by the store at creation; read-only here.
    pub created_at: Option<DateTime<Utc>>,
    /// Set by the store on every write; read-only here.
    pub updated_at: Option<DateTime<Utc>>,
}

impl VerificationRecord {
    /// Verification completion percentage in `[0, 100]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.flags.progress()
    }

    /// Full display name, skipping missing parts.
    #[must_use]
    pub fn display_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Case-insensitive match over names, email, and phone number; the
    /// directory search predicate.
    #[must_use]
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return true;
        }
        let needle = term.to_lowercase();
        let haystacks = [
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.email.as_deref(),
        ];
        if haystacks
            .into_iter()
            .flatten()
            .any(|value| value.to_lowercase().contains(&needle))
        {
            return true;
        }
        self.phone_number
            .as_deref()
            .is_some_and(|phone| phone.contains(term))
    }
}
