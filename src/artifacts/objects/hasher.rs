//! Pluggable digest strategy
//!
//! The object store never hard-codes a digest; it asks its [`ObjectHasher`] for one. The
//! algorithm is chosen once per repository (`[core] hash` in the config file) and every
//! object ID in that repository has the matching length.

use crate::artifacts::objects::object_id::ObjectId;
use serde::{Deserialize, Serialize};
use sha1::Digest;

pub trait ObjectHasher: std::fmt::Debug + Send + Sync {
    fn algorithm(&self) -> HashAlgorithm;

    fn digest(&self, data: &[u8]) -> ObjectId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    pub fn hasher(self) -> Box<dyn ObjectHasher> {
        match self {
            HashAlgorithm::Sha1 => Box::new(Sha1Hasher),
            HashAlgorithm::Sha256 => Box::new(Sha256Hasher),
        }
    }

    /// Length of an object ID in hex characters
    pub fn hex_len(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 40,
            HashAlgorithm::Sha256 => 64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Hasher;

impl ObjectHasher for Sha1Hasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha1
    }

    fn digest(&self, data: &[u8]) -> ObjectId {
        ObjectId::from_digest(sha1::Sha1::digest(data))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ObjectHasher for Sha256Hasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }

    fn digest(&self, data: &[u8]) -> ObjectId {
        ObjectId::from_digest(sha2::Sha256::digest(data))
    }
}
