//! Config fingerprinting: deterministic identification of an engine configuration.
//!
//! Trade records carry the fingerprint so downstream analytics can group
//! signals by the exact parameter set that produced them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 hex digest of a canonical JSON serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigHash(String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash the JSON form of `value`.
///
/// Struct fields serialize in declaration order, so equal configs always hash equally.
pub fn hash_json<T: Serialize>(value: &T) -> Result<ConfigHash, serde_json::Error> {
    let json = serde_json::to_vec(value)?;
    Ok(ConfigHash::from_bytes(&json))
}
