use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::settings::PlatformSettings;
use crate::domain::tier::lookup;
use crate::errors::DomainError;
use crate::pricing::financials::Financials;

#[derive(Clone, Copy, Debug)]
pub struct RentalQuoteInput<'a> {
    pub daily_price: Decimal,
    pub days: u32,
    pub financials: Financials,
    pub settings: &'a PlatformSettings,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalQuoteStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalQuote {
    pub days: u32,
    pub rental_subtotal: Decimal,
    pub peace_fund_total: Decimal,
    pub service_fee: Decimal,
    pub total: Decimal,
    pub deductible: Decimal,
    pub coverage_cap: Decimal,
    pub steps: Vec<RentalQuoteStep>,
}

/// Prices a rental the renter pays for: rent, Peace Fund per day, and the platform fee.
///
/// Amounts too large for a `Decimal` are rejected rather than wrapped or panicked on.
pub fn quote_rental(input: RentalQuoteInput<'_>) -> Result<RentalQuote, DomainError> {
    let days = Decimal::from(input.days);
    let rental_subtotal = checked("rental subtotal", input.daily_price.checked_mul(days))?;
    let peace_fund_total =
        checked("Peace Fund total", input.financials.peace_fund_fee.checked_mul(days))?;
    let service_fee = checked(
        "service fee",
        rental_subtotal
            .checked_mul(input.settings.service_fee_pct)
            .and_then(|fee| fee.checked_div(Decimal::ONE_HUNDRED)),
    )?
    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let total = checked(
        "total",
        rental_subtotal.checked_add(peace_fund_total).and_then(|sum| sum.checked_add(service_fee)),
    )?;

    Ok(RentalQuote {
        days: input.days,
        rental_subtotal,
        peace_fund_total,
        service_fee,
        total,
        deductible: input.financials.deductible,
        coverage_cap: lookup(input.financials.current_tier).coverage_cap,
        steps: vec![
            RentalQuoteStep {
                stage: "rental_subtotal".to_string(),
                detail: "daily_price * days".to_string(),
                amount: rental_subtotal,
            },
            RentalQuoteStep {
                stage: "peace_fund".to_string(),
                detail: format!("tier {} fee * days", input.financials.current_tier),
                amount: peace_fund_total,
            },
            RentalQuoteStep {
                stage: "service_fee".to_string(),
                detail: format!("{}% of rental subtotal", input.settings.service_fee_pct),
                amount: service_fee,
            },
        ],
    })
}

fn checked(stage: &str, amount: Option<Decimal>) -> Result<Decimal, DomainError> {
    amount.ok_or_else(|| DomainError::AmountOutOfRange(format!("{stage} does not fit a decimal")))
}
