use crate::commands::{open_pool, run_with_config, CommandResult};

pub fn run() -> CommandResult {
    run_with_config("migrate", |config| async move {
        let pool = open_pool(&config).await?;
        pool.close().await;
        tracing::info!(event_name = "cli.migrate.applied", "migrations applied");
        Ok("applied pending migrations".to_string())
    })
}
