//! Opaque payloads exchanged during a round.
//!
//! The engine never interprets these bytes; their meaning belongs entirely
//! to the reporting plugin. Each payload wraps a reference-counted [`Bytes`]
//! buffer, so handing an outcome from the chain to the next round shares the
//! committed buffer instead of copying it.

use bytes::Bytes;
use std::fmt;

/// Bytes shown by `Debug` before truncating.
const DEBUG_PREFIX_LEN: usize = 16;

macro_rules! opaque_payload {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Default)]
        pub struct $name(Bytes);

        impl $name {
            pub fn new(bytes: impl Into<Bytes>) -> Self {
                Self(bytes.into())
            }

            pub fn empty() -> Self {
                Self(Bytes::new())
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// The shared buffer backing this payload.
            pub fn bytes(&self) -> &Bytes {
                &self.0
            }

            pub fn into_bytes(self) -> Bytes {
                self.0
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(value: Vec<u8>) -> Self {
                Self(Bytes::from(value))
            }
        }

        impl From<Bytes> for $name {
            fn from(value: Bytes) -> Self {
                Self(value)
            }
        }

        impl From<&'static [u8]> for $name {
            fn from(value: &'static [u8]) -> Self {
                Self(Bytes::from_static(value))
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let shown = &self.0[..self.0.len().min(DEBUG_PREFIX_LEN)];
                let ellipsis = if self.0.len() > DEBUG_PREFIX_LEN { ".." } else { "" };
                write!(
                    f,
                    "{}(len={}, 0x{}{})",
                    stringify!($name),
                    self.0.len(),
                    hex::encode(shown),
                    ellipsis
                )
            }
        }
    };
}

opaque_payload!(
    /// Query issued by the round leader to every follower.
    Query
);

opaque_payload!(
    /// Observation produced by one oracle for a query.
    Observation
);

opaque_payload!(
    /// Consensus outcome committed for one sequence number.
    Outcome
);

opaque_payload!(
    /// Report derived from an outcome, destined for external delivery.
    Report
);

/// The kind of payload a length limit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Query,
    Observation,
    Outcome,
    Report,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Query => "query",
            PayloadKind::Observation => "observation",
            PayloadKind::Outcome => "outcome",
            PayloadKind::Report => "report",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
