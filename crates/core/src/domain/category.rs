use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::tier::RiskTier;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub String);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tool category as published by the backend. Read-only on this side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub default_risk_tier: RiskTier,
    pub default_daily_fee: Decimal,
    pub default_deductible: Decimal,
}

impl Category {
    pub fn find<'a>(categories: &'a [Category], id: &CategoryId) -> Option<&'a Category> {
        categories.iter().find(|category| &category.id == id)
    }
}
