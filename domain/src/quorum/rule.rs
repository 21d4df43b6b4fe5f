//! Symbolic quorum kinds and their resolution to concrete counts.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Symbolic observation threshold
///
/// # Example
///
/// ```
/// use reporting_domain::quorum::Quorum;
///
/// // n = 4, f = 1
/// assert_eq!(Quorum::FPlusOne.resolve(4, 1), 2);
/// assert_eq!(Quorum::TwoFPlusOne.resolve(4, 1), 3);
/// assert_eq!(Quorum::ByzQuorum.resolve(4, 1), 3);
/// assert_eq!(Quorum::NMinusF.resolve(4, 1), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quorum {
    /// Guarantees at least one honest observation
    FPlusOne,

    /// Guarantees an honest majority of observations
    TwoFPlusOne,

    /// Guarantees that all sets of observations overlap in at least one honest oracle
    ByzQuorum,

    /// Maximal number of observations we can rely on being available
    NMinusF,
}

impl Quorum {
    pub const ALL: [Quorum; 4] = [
        Quorum::FPlusOne,
        Quorum::TwoFPlusOne,
        Quorum::ByzQuorum,
        Quorum::NMinusF,
    ];

    /// Resolve this kind to a concrete count for `n` oracles tolerating `f` faults.
    ///
    /// Callers must uphold `0 <= f < n`; configuration validation guarantees it
    /// for every running instance.
    pub fn resolve(self, n: usize, f: usize) -> usize {
        match self {
            Quorum::FPlusOne => f + 1,
            Quorum::TwoFPlusOne => 2 * f + 1,
            Quorum::ByzQuorum => (n + f + 1).div_ceil(2),
            Quorum::NMinusF => n - f,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quorum::FPlusOne => "f_plus_one",
            Quorum::TwoFPlusOne => "two_f_plus_one",
            Quorum::ByzQuorum => "byz_quorum",
            Quorum::NMinusF => "n_minus_f",
        }
    }

    /// Get a human-readable description of this quorum
    pub fn description(&self) -> &'static str {
        match self {
            Quorum::FPlusOne => "f+1 (at least one honest observation)",
            Quorum::TwoFPlusOne => "2f+1 (honest majority)",
            Quorum::ByzQuorum => "byzantine quorum (honest overlap)",
            Quorum::NMinusF => "n-f (all reliably available)",
        }
    }
}

/// Resolve a quorum kind against `(n, f)`.
pub fn resolve(kind: Quorum, n: usize, f: usize) -> usize {
    kind.resolve(n, f)
}

impl std::fmt::Display for Quorum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::str::FromStr for Quorum {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "f+1" | "f_plus_one" | "fplusone" => Ok(Quorum::FPlusOne),
            "2f+1" | "two_f_plus_one" | "twofplusone" => Ok(Quorum::TwoFPlusOne),
            "byz" | "byz_quorum" | "byzquorum" => Ok(Quorum::ByzQuorum),
            "n_f" | "n_minus_f" | "nminusf" => Ok(Quorum::NMinusF),
            _ => Err(DomainError::UnknownQuorum(s.to_string())),
        }
    }
}
