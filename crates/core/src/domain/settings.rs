use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Platform-wide fee settings, the second static reference dataset next to categories.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSettings {
    /// Percentage of the rental subtotal charged as a service fee (e.g. `10.00`).
    pub service_fee_pct: Decimal,
    pub max_rental_days: u32,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self { service_fee_pct: Decimal::new(1000, 2), max_rental_days: 30 }
    }
}
