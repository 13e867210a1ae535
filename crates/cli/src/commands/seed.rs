use toolshare_db::ReferenceSeedDataset;

use crate::commands::{open_pool, run_with_config, CommandResult};

pub fn run() -> CommandResult {
    run_with_config("seed", |config| async move {
        let pool = open_pool(&config).await?;

        let seeded = ReferenceSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = ReferenceSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
        pool.close().await;

        if !verification.all_present {
            return Err(("seed_verification", failed_checks_message(&verification.checks), 6u8));
        }

        tracing::info!(
            event_name = "cli.seed.loaded",
            categories = seeded.categories_seeded.len(),
            "reference data seeded"
        );
        Ok(format!(
            "reference data loaded: {} categories ({}) and platform settings",
            seeded.categories_seeded.len(),
            seeded.categories_seeded.join(", ")
        ))
    })
}

fn failed_checks_message(checks: &[(&'static str, bool)]) -> String {
    let failed =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed.is_empty() {
        "some reference data failed to load".to_string()
    } else {
        format!("seed verification failed for checks: {}", failed.join(", "))
    }
}
