//! Ledger hashes
//!
//! Key hashes, script hashes and policy ids are all blake2b-224 digests.

use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

type Blake2b224 = Blake2b<U28>;
type Blake2b256 = Blake2b<U32>;

/// Length of a credential / policy hash in bytes
pub const HASH28_LEN: usize = 28;

/// A 28-byte ledger hash (payment key hash, script hash, policy id)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash28([u8; HASH28_LEN]);

impl Hash28 {
    pub const fn new(bytes: [u8; HASH28_LEN]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, rejecting anything that is not exactly 28 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; HASH28_LEN] =
            bytes
                .try_into()
                .map_err(|_| CoreError::InvalidCredentialLength {
                    expected: HASH28_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH28_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash28 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash28 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash28({})", self.to_hex())
    }
}

impl FromStr for Hash28 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Hash28 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash28 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// blake2b-224 digest of the concatenated parts
pub fn blake2b_224(parts: &[&[u8]]) -> Hash28 {
    let mut hasher = Blake2b224::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; HASH28_LEN];
    out.copy_from_slice(&hasher.finalize());
    Hash28(out)
}

/// blake2b-256 digest, used for transaction ids
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}
