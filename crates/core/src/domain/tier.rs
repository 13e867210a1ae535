use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Peace Fund protection tier. Ordering follows risk: `Low < Medium < High`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RiskTier {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Medium, RiskTier::High];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl TryFrom<u8> for RiskTier {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            other => Err(DomainError::InvalidRiskTier(i64::from(other))),
        }
    }
}

impl TryFrom<i64> for RiskTier {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| DomainError::InvalidRiskTier(value))
            .and_then(RiskTier::try_from)
    }
}

impl From<RiskTier> for u8 {
    fn from(value: RiskTier) -> Self {
        value.as_u8()
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierProfile {
    pub tier: RiskTier,
    pub daily_fee: Decimal,
    pub deductible: Decimal,
    pub coverage_cap: Decimal,
}

// Decimal::from_parts(lo, mid, hi, negative, scale)
const TIER_TABLE: [TierProfile; 3] = [
    TierProfile {
        tier: RiskTier::Low,
        daily_fee: Decimal::from_parts(150, 0, 0, false, 2),
        deductible: Decimal::from_parts(25, 0, 0, false, 0),
        coverage_cap: Decimal::from_parts(300, 0, 0, false, 0),
    },
    TierProfile {
        tier: RiskTier::Medium,
        daily_fee: Decimal::from_parts(400, 0, 0, false, 2),
        deductible: Decimal::from_parts(75, 0, 0, false, 0),
        coverage_cap: Decimal::from_parts(1000, 0, 0, false, 0),
    },
    TierProfile {
        tier: RiskTier::High,
        daily_fee: Decimal::from_parts(900, 0, 0, false, 2),
        deductible: Decimal::from_parts(250, 0, 0, false, 0),
        coverage_cap: Decimal::from_parts(3000, 0, 0, false, 0),
    },
];

/// Returns the Peace Fund profile for `tier`.
pub fn lookup(tier: RiskTier) -> TierProfile {
    TIER_TABLE[usize::from(tier.as_u8() - 1)]
}

/// Table access that tolerates a missing row; callers fall back to category defaults.
pub(crate) fn find_profile(tier: RiskTier) -> Option<&'static TierProfile> {
    TIER_TABLE.iter().find(|profile| profile.tier == tier)
}

pub fn all_profiles() -> &'static [TierProfile] {
    &TIER_TABLE
}
