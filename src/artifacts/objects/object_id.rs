//! Object identifier
//!
//! Object IDs are lowercase hexadecimal digests: 40 characters for SHA-1 repositories and
//! 64 characters for SHA-256 repositories.
//!
//! Objects are stored in `.twig/objects/<first-2-chars>/<remaining-chars>`.

use crate::artifacts::objects::SHORT_OID_LENGTH;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Accepted digest lengths, in hex characters
pub const OBJECT_ID_LENGTHS: [usize; 2] = [40, 64];

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object ID from a string
    pub fn try_parse(id: String) -> anyhow::Result<Self> {
        if !OBJECT_ID_LENGTHS.contains(&id.len()) {
            anyhow::bail!("Invalid object ID length: {}", id.len());
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("Invalid object ID characters: {}", id);
        }

        Ok(Self(id.to_ascii_lowercase()))
    }

    /// Build an ID from a finished digest
    pub(crate) fn from_digest(digest: impl std::fmt::LowerHex) -> Self {
        Self(format!("{digest:x}"))
    }

    /// Whether a string could be a (possibly abbreviated) object ID
    pub fn looks_like_prefix(candidate: &str, min_len: usize) -> bool {
        candidate.len() >= min_len
            && candidate.len() <= OBJECT_ID_LENGTHS[1]
            && candidate.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Convert to the loose-object path, `ab/cdef...`
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// Get abbreviated form of the object ID
    pub fn to_short_oid(&self) -> String {
        self.0[..SHORT_OID_LENGTH.min(self.0.len())].to_string()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(&prefix.to_ascii_lowercase())
    }
}

impl TryFrom<String> for ObjectId {
    type Error = anyhow::Error;

    fn try_from(value: String) -> anyhow::Result<Self> {
        Self::try_parse(value)
    }
}

impl From<ObjectId> for String {
    fn from(value: ObjectId) -> Self {
        value.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
