//! Identifier value objects: sequence numbers, oracle indices, config digests

use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sequence number of a round/outcome.
///
/// Sequence numbers start at 1. The committed outcome chain holds exactly one
/// outcome per sequence number, although a node may attempt the same sequence
/// number several times before one commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeqNr(u64);

impl SeqNr {
    /// The first sequence number of every protocol instance.
    pub const FIRST: SeqNr = SeqNr(1);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this is the first sequence number (whose previous outcome is absent).
    pub const fn is_first(self) -> bool {
        self.0 == 1
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The preceding sequence number, or `None` for `FIRST` and zero.
    pub fn prev(self) -> Option<Self> {
        if self.0 <= 1 {
            None
        } else {
            Some(Self(self.0 - 1))
        }
    }
}

impl fmt::Display for SeqNr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SeqNr {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Index of an oracle in `[0, n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OracleId(u8);

impl OracleId {
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Oracle ids `0..n`, saturating at the `u8` range.
    pub fn all(n: usize) -> impl Iterator<Item = OracleId> {
        (0..n.min(u8::MAX as usize + 1)).map(|i| OracleId(i as u8))
    }
}

impl TryFrom<usize> for OracleId {
    type Error = DomainError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map(OracleId)
            .map_err(|_| DomainError::InvalidOracleId {
                oracle_id: value,
                n: u8::MAX as usize + 1,
            })
    }
}

impl fmt::Display for OracleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "oracle-{}", self.0)
    }
}

/// 32-byte identifier of a protocol configuration.
///
/// A plugin instance serves exactly one digest for its whole lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConfigDigest([u8; 32]);

impl ConfigDigest {
    pub const LEN: usize = 32;

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ConfigDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for ConfigDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigDigest({})", hex::encode(&self.0))
    }
}

impl FromStr for ConfigDigest {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let bytes = hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
            .map_err(|e| DomainError::InvalidDigest(format!("{s}: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            DomainError::InvalidDigest(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_nr_navigation() {
        assert!(SeqNr::FIRST.is_first());
        assert_eq!(SeqNr::FIRST.prev(), None);
        assert_eq!(SeqNr::new(0).prev(), None);
        assert_eq!(SeqNr::new(5).prev(), Some(SeqNr::new(4)));
        assert_eq!(SeqNr::FIRST.next(), SeqNr::new(2));
    }

    #[test]
    fn test_oracle_id_all() {
        let ids: Vec<_> = OracleId::all(4).collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[3].index(), 3);
        assert!(OracleId::try_from(300usize).is_err());
    }

    #[test]
    fn test_digest_roundtrip_through_display() {
        let digest = ConfigDigest::new([7u8; 32]);
        let parsed: ConfigDigest = digest.to_string().parse().unwrap();
        assert_eq!(parsed, digest);
    }

    #[test]
    fn test_digest_rejects_wrong_length() {
        assert!("0x0102".parse::<ConfigDigest>().is_err());
        assert!("not-hex".parse::<ConfigDigest>().is_err());
    }

    #[test]
    fn test_digest_rejects_signed_hex_pairs() {
        let signed = "+1".repeat(32);
        assert!(signed.parse::<ConfigDigest>().is_err());
        let prefixed = format!("0x{}", "01".repeat(32));
        assert_eq!(
            prefixed.parse::<ConfigDigest>().unwrap(),
            ConfigDigest::new([1u8; 32])
        );
    }
}
