use serde::Deserialize;
use std::collections::HashSet;

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

#[derive(Debug, Deserialize)]
struct CategoryContract {
    id: String,
    default_risk_tier: u8,
}

#[derive(Debug, Deserialize)]
struct SettingsContract {
    service_fee_pct: String,
    max_rental_days: u32,
}

#[derive(Debug, Deserialize)]
struct SeedContract {
    dataset_version: String,
    seed_dataset: String,
    categories: Vec<CategoryContract>,
    platform_settings: SettingsContract,
}

fn contract() -> SeedContractTestResult<SeedContract> {
    serde_json::from_str(include_str!("../../../config/fixtures/reference_seed_contract.json"))
        .map_err(|error| format!("seed contract JSON must parse: {error}"))
}

/// Finds the SQL values row for a category and returns its comma-separated fields.
fn category_row<'a>(fixture_sql: &'a str, id: &str) -> Option<Vec<&'a str>> {
    let needle = format!("('{id}',");
    let line = fixture_sql.lines().find(|line| line.trim_start().starts_with(&needle))?;
    let before_keywords = line.split("'[").next()?;
    Some(
        before_keywords
            .split(',')
            .map(|field| field.trim().trim_matches(|c| c == '(' || c == '\''))
            .collect(),
    )
}

#[test]
fn seed_contract_matches_reference_seed_sql_fixture() -> SeedContractTestResult {
    let fixture_sql = include_str!("../../../config/fixtures/reference_seed.sql");
    let contract = contract()?;
    let mut ids_seen = HashSet::new();

    require_eq!(contract.dataset_version, "reference-v1");
    require_eq!(contract.seed_dataset, "deterministic_reference_data");
    require!(!contract.categories.is_empty());

    for category in &contract.categories {
        require!(ids_seen.insert(category.id.clone()), "duplicate category id: {}", category.id);
        require!(
            (1..=3).contains(&category.default_risk_tier),
            "tier out of range for {}",
            category.id
        );

        let row = category_row(fixture_sql, &category.id)
            .ok_or_else(|| format!("seed SQL fixture should include category {}", category.id))?;
        require_eq!(row.get(2).copied(), Some(category.default_risk_tier.to_string().as_str()));
    }

    require!(
        fixture_sql.contains(&format!(
            "(1, '{}', {})",
            contract.platform_settings.service_fee_pct, contract.platform_settings.max_rental_days
        )),
        "seed SQL fixture should include the contract platform settings"
    );
    Ok(())
}

#[test]
fn seeded_category_defaults_follow_the_tier_table() -> SeedContractTestResult {
    let fixture_sql = include_str!("../../../config/fixtures/reference_seed.sql");
    let contract = contract()?;
    let expected = [("1", "1.50", "25"), ("2", "4.00", "75"), ("3", "9.00", "250")];

    for category in &contract.categories {
        let row = category_row(fixture_sql, &category.id)
            .ok_or_else(|| format!("missing category row {}", category.id))?;
        let (_, fee, deductible) = expected
            .iter()
            .find(|(tier, _, _)| row.get(2).copied() == Some(*tier))
            .ok_or_else(|| format!("unexpected tier for {}", category.id))?;
        require_eq!(row.get(3).copied(), Some(*fee));
        require_eq!(row.get(4).copied(), Some(*deductible));
    }

    for tier in 1..=3u8 {
        require!(
            contract.categories.iter().any(|category| category.default_risk_tier == tier),
            "every tier should have at least one seeded category, missing {tier}"
        );
    }
    Ok(())
}
