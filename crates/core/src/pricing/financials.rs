use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::category::Category;
use crate::domain::listing::ListingValidationError;
use crate::domain::tier::{find_profile, RiskTier};

/// Peace Fund figures for the currently selected category and tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Financials {
    pub current_tier: RiskTier,
    pub peace_fund_fee: Decimal,
    pub deductible: Decimal,
}

impl Financials {
    /// Placeholder shown before any category is chosen.
    pub const UNSELECTED: Financials = Financials {
        current_tier: RiskTier::Low,
        peace_fund_fee: Decimal::ZERO,
        deductible: Decimal::ZERO,
    };
}

pub fn effective_tier(category: &Category, tier_override: Option<RiskTier>) -> RiskTier {
    tier_override.unwrap_or(category.default_risk_tier)
}

/// Derives the active tier and its fee/deductible. Total; recompute on every change.
pub fn compute_financials(
    category: Option<&Category>,
    tier_override: Option<RiskTier>,
) -> Financials {
    let Some(category) = category else {
        return Financials::UNSELECTED;
    };

    let current_tier = effective_tier(category, tier_override);
    match find_profile(current_tier) {
        Some(profile) => Financials {
            current_tier,
            peace_fund_fee: profile.daily_fee,
            deductible: profile.deductible,
        },
        None => Financials {
            current_tier,
            peace_fund_fee: category.default_daily_fee,
            deductible: category.default_deductible,
        },
    }
}

/// Overrides are upgrade-only.
pub fn validate_tier_override(
    category: &Category,
    tier_override: Option<RiskTier>,
) -> Result<(), ListingValidationError> {
    match tier_override {
        Some(requested) if requested < category.default_risk_tier => {
            Err(ListingValidationError::TierBelowCategoryDefault {
                requested,
                minimum: category.default_risk_tier,
            })
        }
        _ => Ok(()),
    }
}
