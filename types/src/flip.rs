//! Flip identifiers and the raw flip records returned by the node.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a flip, stable across fetches.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlipHash(String);

impl FlipHash {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlipHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlipHash {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FlipHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One element of `flip_shortHashes` / `flip_longHashes`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipHashEntry {
    pub hash: FlipHash,
    /// Reserve flip, only shown if a required flip never becomes available.
    #[serde(default)]
    pub extra: bool,
    /// The node holds the flip's data.
    #[serde(default)]
    pub ready: bool,
}

/// Result of `flip_get`.
///
/// Fields the node omits fall back to the values from the hash listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipPayload {
    /// `0x`-prefixed hex of the RLP-encoded flip.
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub hidden: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_entry_defaults_missing_flags() {
        let entry: FlipHashEntry = serde_json::from_str(r#"{"hash":"0xabc"}"#).unwrap();
        assert_eq!(entry.hash.as_str(), "0xabc");
        assert!(!entry.extra);
        assert!(!entry.ready);
    }

    #[test]
    fn payload_keeps_only_present_fields() {
        let payload: FlipPayload = serde_json::from_str(r#"{"hex":"0xc0"}"#).unwrap();
        assert_eq!(payload.hex.as_deref(), Some("0xc0"));
        assert_eq!(payload.ready, None);
        assert_eq!(payload.hidden, None);
    }

    #[test]
    fn flip_hash_serializes_as_plain_string() {
        let hash = FlipHash::new("0x01");
        assert_eq!(serde_json::to_string(&hash).unwrap(), r#""0x01""#);
    }
}
