//! Partial record updates.
//!
//! A patch carries only the fields an administrator explicitly provided;
//! omission means "leave unchanged", never "clear". Contact fields are
//! owned by the intake flow and are stripped before forwarding.

use serde::Serialize;
use serde_json::Value;

use crate::error::{ConsoleError, ConsoleResult};
use crate::record::{DocumentFields, VerificationCheck};

const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Fields an update may carry. `None` leaves the store value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citizenship_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,

    /// Immutable through this path; stripped before forwarding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Immutable through this path; stripped before forwarding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    /// Must already be canonical `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_issue_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_expiry_date: Option<String>,

    #[serde(rename = "isEmailVerified", skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(rename = "isDocumentVerified", skip_serializing_if = "Option::is_none")]
    pub document_verified: Option<bool>,
    #[serde(rename = "isSelfieVerified", skip_serializing_if = "Option::is_none")]
    pub selfie_verified: Option<bool>,
    #[serde(rename = "isLivenessVerified", skip_serializing_if = "Option::is_none")]
    pub liveness_verified: Option<bool>,
}

impl RecordPatch {
    /// A patch flipping exactly one verification check.
    #[must_use]
    pub fn verification(check: VerificationCheck, verified: bool) -> Self {
        let mut patch = Self::default();
        match check {
            VerificationCheck::Email => patch.email_verified = Some(verified),
            VerificationCheck::Document => patch.document_verified = Some(verified),
            VerificationCheck::Selfie => patch.selfie_verified = Some(verified),
            VerificationCheck::Liveness => patch.liveness_verified = Some(verified),
        }
        patch
    }

    /// Returns `true` when no field was provided at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_document().is_empty()
    }

    /// Returns `true` when the patch attempts to change a contact field.
    #[must_use]
    pub fn touches_contact_fields(&self) -> bool {
        self.email.is_some() || self.phone_number.is_some()
    }

    /// Strips the immutable contact fields, returning whether any were set.
    #[must_use]
    pub fn without_contact_fields(mut self) -> (Self, bool) {
        let dropped = self.touches_contact_fields();
        self.email = None;
        self.phone_number = None;
        (self, dropped)
    }

    /// Rejects date fields that are not canonical `YYYY-MM-DD`.
    pub fn validate_dates(&self) -> ConsoleResult<()> {
        let dates = [
            ("dob", self.dob.as_deref()),
            ("idIssueDate", self.id_issue_date.as_deref()),
            ("idExpiryDate", self.id_expiry_date.as_deref()),
        ];
        for (field, value) in dates {
            if let Some(value) = value {
                if chrono::NaiveDate::parse_from_str(value, CANONICAL_DATE_FORMAT).is_err() {
                    return Err(ConsoleError::validation(format!(
                        "{field} must be a YYYY-MM-DD date, got `{value}`"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Serializes the provided fields into the store's wire shape.
    ///
    /// Omitted fields never appear in the output map.
    #[must_use]
    pub fn to_document(&self) -> DocumentFields {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            _ => DocumentFields::new(),
        }
    }
}
