use rust_decimal::Decimal;
use serde::Serialize;
use toolshare_core::catalog::ReferenceDataCache;
use toolshare_core::domain::category::{Category, CategoryId};
use toolshare_core::domain::tier::RiskTier;
use toolshare_core::pricing::{
    compute_financials, quote_rental, validate_tier_override, Financials, RentalQuote,
    RentalQuoteInput,
};
use toolshare_db::repositories::SqlCategoryRepository;

use crate::commands::{interface_failure, open_pool, run_with_config, CommandError, CommandResult};

#[derive(Clone, Debug)]
pub struct FinancialsArgs {
    pub category: String,
    pub tier: Option<u8>,
    /// Both or neither; the quote is only rendered when present.
    pub daily_price: Option<Decimal>,
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
struct FinancialsReport {
    category: Category,
    tier_override: Option<RiskTier>,
    financials: Financials,
    #[serde(skip_serializing_if = "Option::is_none")]
    quote: Option<RentalQuote>,
}

/// Prints Peace Fund figures for a seeded category, optionally with a rental quote.
/// The success message is the JSON-encoded report.
pub fn run(args: FinancialsArgs) -> CommandResult {
    run_with_config("financials", |config| async move {
        let tier_override = parse_tier(args.tier)?;

        let pool = open_pool(&config).await?;
        let source = SqlCategoryRepository::new(pool.clone());
        let cache = ReferenceDataCache::new();
        let category_id = CategoryId(args.category.clone());

        let category = cache
            .category(&source, &category_id)
            .await
            .map_err(interface_failure)?
            .ok_or_else(|| {
                let message = format!("unknown category `{category_id}` (run `toolshare seed`)");
                ("not_found", message, 7u8)
            })?;
        validate_tier_override(&category, tier_override).map_err(interface_failure)?;

        let financials = compute_financials(Some(&category), tier_override);
        let quote = match (args.daily_price, args.days) {
            (Some(daily_price), Some(days)) => {
                let settings =
                    cache.platform_settings(&source).await.map_err(interface_failure)?;
                let quote = quote_rental(RentalQuoteInput {
                    daily_price,
                    days,
                    financials,
                    settings: &settings,
                })
                .map_err(interface_failure)?;
                Some(quote)
            }
            _ => None,
        };
        pool.close().await;

        let report = FinancialsReport { category, tier_override, financials, quote };
        serde_json::to_string(&report).map_err(|error| ("serialization", error.to_string(), 9u8))
    })
}

fn parse_tier(raw: Option<u8>) -> Result<Option<RiskTier>, CommandError> {
    raw.map(RiskTier::try_from)
        .transpose()
        .map_err(|error| ("invalid_input", error.to_string(), 8u8))
}

#[cfg(test)]
mod tests {
    use toolshare_core::domain::tier::RiskTier;

    use super::parse_tier;

    #[test]
    fn tier_argument_must_be_a_published_tier() {
        assert_eq!(parse_tier(None), Ok(None));
        assert_eq!(parse_tier(Some(3)), Ok(Some(RiskTier::High)));

        let (class, _, code) = parse_tier(Some(4)).expect_err("tier 4 does not exist");
        assert_eq!(class, "invalid_input");
        assert_eq!(code, 8);
    }
}
