//! Normalization of raw store documents into [`VerificationRecord`]s.
//!
//! The record store's native temporal encoding varies with the writer:
//! the intake flow stores plain `YYYY-MM-DD` strings, older records carry
//! RFC 3339 timestamps, and server-written fields arrive as
//! `{seconds, nanos}` timestamp objects or epoch numbers. Everything is
//! canonicalized to the calendar date; a value that cannot be interpreted
//! is carried through raw so the record stays visible.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tracing::debug;

use crate::record::{DocumentFields, RecordDocument, VerificationFlags, VerificationRecord};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonicalizes one store value to a `YYYY-MM-DD` date string.
///
/// Idempotent: a value already in canonical form is returned unchanged.
#[must_use]
pub fn canonical_date(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            if NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok() {
                return Some(s.clone());
            }
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|instant| instant.date_naive().format(DATE_FORMAT).to_string())
        }
        _ => canonical_instant(value).map(|instant| instant.date_naive().format(DATE_FORMAT).to_string()),
    }
}

/// Parses one store value as a UTC instant, tolerating every encoding the
/// store is known to emit.
#[must_use]
pub fn canonical_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|instant| instant.with_timezone(&Utc)),
        Value::Object(map) => {
            let seconds = map.get("seconds").and_then(Value::as_i64)?;
            let nanos = map
                .get("nanos")
                .and_then(Value::as_i64)
                .unwrap_or(0)
                .clamp(0, 999_999_999) as u32;
            DateTime::from_timestamp(seconds, nanos)
        }
        Value::Number(_) => {
            let raw = value.as_i64()?;
            // Magnitudes past ~5138 CE in seconds are epoch milliseconds.
            if raw.abs() >= 100_000_000_000 {
                DateTime::from_timestamp_millis(raw)
            } else {
                DateTime::from_timestamp(raw, 0)
            }
        }
        _ => None,
    }
}

/// Normalizes one raw document into a [`VerificationRecord`].
///
/// Total: malformed individual fields degrade (raw carry-through for dates,
/// `None` for unreadable strings, `false` for unreadable flags) rather than
/// dropping the record.
#[must_use]
pub fn normalize_record(doc: &RecordDocument) -> VerificationRecord {
    let fields = &doc.fields;
    VerificationRecord {
        owner_id: doc.id.clone(),
        first_name: string_field(fields, "firstName"),
        last_name: string_field(fields, "lastName"),
        father_name: string_field(fields, "fatherName"),
        gender: string_field(fields, "gender"),
        address: string_field(fields, "address"),
        email: string_field(fields, "email"),
        phone_number: string_field(fields, "phoneNumber"),
        citizenship_number: string_field(fields, "citizenshipNumber"),
        license_number: string_field(fields, "licenseNumber"),
        dob: date_field(fields, "dob", &doc.id),
        id_issue_date: date_field(fields, "idIssueDate", &doc.id),
        id_expiry_date: date_field(fields, "idExpiryDate", &doc.id),
        flags: VerificationFlags {
            email_verified: bool_field(fields, "isEmailVerified"),
            document_verified: bool_field(fields, "isDocumentVerified"),
            selfie_verified: bool_field(fields, "isSelfieVerified"),
            liveness_verified: bool_field(fields, "isLivenessVerified"),
        },
        created_at: fields.get("createdAt").and_then(canonical_instant),
        updated_at: fields.get("updatedAt").and_then(canonical_instant),
    }
}

fn string_field(fields: &DocumentFields, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        // Phone and id numbers occasionally arrive as bare numbers.
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn bool_field(fields: &DocumentFields, key: &str) -> bool {
    fields.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn date_field(fields: &DocumentFields, key: &str, owner_id: &str) -> Option<String> {
    let value = fields.get(key)?;
    if value.is_null() {
        return None;
    }
    match canonical_date(value) {
        Some(date) => Some(date),
        None => {
            debug!(owner_id, field = key, "date field left unnormalized");
            match value {
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: Value) -> RecordDocument {
        let Value::Object(fields) = fields else {
            panic!("fixture must be an object");
        };
        RecordDocument::new("u1", fields)
    }

    #[test]
    fn canonical_form_is_a_fixed_point() {
        let value = json!("1990-04-01");
        let once = canonical_date(&value).unwrap();
        assert_eq!(once, "1990-04-01");
        let twice = canonical_date(&json!(once)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rfc3339_collapses_to_the_calendar_date() {
        let value = json!("1990-04-01T13:45:00+05:45");
        assert_eq!(canonical_date(&value).unwrap(), "1990-04-01");
    }

    #[test]
    fn timestamp_objects_and_epochs_normalize() {
        // 2021-01-01T00:00:00Z
        assert_eq!(
            canonical_date(&json!({ "seconds": 1_609_459_200 })).unwrap(),
            "2021-01-01"
        );
        assert_eq!(canonical_date(&json!(1_609_459_200)).unwrap(), "2021-01-01");
        assert_eq!(
            canonical_date(&json!(1_609_459_200_000i64)).unwrap(),
            "2021-01-01"
        );
    }

    #[test]
    fn unparseable_dates_are_carried_through_raw() {
        let record = normalize_record(&doc(json!({ "dob": "next tuesday" })));
        assert_eq!(record.dob.as_deref(), Some("next tuesday"));

        let record = normalize_record(&doc(json!({ "dob": true })));
        assert_eq!(record.dob.as_deref(), Some("true"));
    }

    #[test]
    fn missing_flags_default_to_false() {
        let record = normalize_record(&doc(json!({ "firstName": "Anita" })));
        assert_eq!(record.flags, VerificationFlags::default());
        assert_eq!(record.progress(), 0.0);
    }

    #[test]
    fn full_document_normalizes() {
        let record = normalize_record(&doc(json!({
            "firstName": "Anita",
            "lastName": "Shrestha",
            "email": "anita@example.com",
            "phoneNumber": 9_771_234_567i64,
            "dob": { "seconds": 638_928_000 },
            "isEmailVerified": true,
            "isDocumentVerified": true,
            "createdAt": "2024-11-05T08:30:00Z",
        })));
        assert_eq!(record.owner_id, "u1");
        assert_eq!(record.phone_number.as_deref(), Some("9771234567"));
        assert_eq!(record.dob.as_deref(), Some("1990-04-01"));
        assert_eq!(record.progress(), 50.0);
        assert!(record.created_at.is_some());
        assert!(record.updated_at.is_none());
    }
}
