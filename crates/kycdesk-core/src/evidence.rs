//! Evidence categories and derived blob references.
//!
//! Uploaded evidence lives in the blob store under
//! `{root}/{owner_id}/{category}`, a path contract shared with the intake
//! flow that performs the uploads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Partition of uploaded evidence files per owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceCategory {
    /// Identity document scans.
    Document,
    /// Selfie photographs.
    Selfie,
    /// Liveness check videos.
    Liveness,
}

impl EvidenceCategory {
    /// Every category, in cascade order.
    pub const ALL: [Self; 3] = [Self::Document, Self::Selfie, Self::Liveness];

    /// Returns the canonical lowercase name used in storage paths.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Selfie => "selfie",
            Self::Liveness => "liveness",
        }
    }

    /// Builds the blob-store prefix for one owner and category.
    #[must_use]
    pub fn prefix(&self, root: &str, owner_id: &str) -> String {
        format!("{root}/{owner_id}/{}", self.as_str())
    }
}

impl fmt::Display for EvidenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(Self::Document),
            "selfie" => Ok(Self::Selfie),
            "liveness" => Ok(Self::Liveness),
            _ => Err(format!("invalid evidence category: {s}")),
        }
    }
}

/// Handle to one stored object, as listed by the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHandle {
    /// Full object key, including the owner/category prefix.
    pub key: String,
}

impl ObjectHandle {
    /// Creates a handle from a full object key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Returns the file name portion of the key.
    #[must_use]
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// A resolved, time-limited access URL for one uploaded evidence file.
///
/// Derived on demand from an [`ObjectHandle`]; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceReference {
    /// Object key the URL was issued for.
    pub key: String,
    /// Signed access URL issued by the blob store.
    pub url: String,
}
