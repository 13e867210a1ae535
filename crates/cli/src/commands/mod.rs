pub mod availability;
pub mod config;
pub mod doctor;
pub mod financials;
pub mod migrate;
pub mod seed;
pub mod suggest;

use serde::Serialize;
use tokio::runtime::Runtime;
use toolshare_core::config::{AppConfig, LoadOptions};
use toolshare_core::errors::{ApplicationError, InterfaceError};
use toolshare_db::{connect_with_settings, migrations, DbPool};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    fn from_error(command: &str, (error_class, message, exit_code): CommandError) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

/// `(error_class, message, exit_code)` raised inside a command's async body.
pub(crate) type CommandError = (&'static str, String, u8);

/// Loads config and an async runtime, then drives `body` to completion. Startup
/// failures map to exit codes 2 (config) and 3 (runtime).
pub(crate) fn run_with_config<F, Fut>(command: &str, body: F) -> CommandResult
where
    F: FnOnce(AppConfig) -> Fut,
    Fut: std::future::Future<Output = Result<String, CommandError>>,
{
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(body(config)) {
        Ok(message) => CommandResult::success(command, message),
        Err(error) => CommandResult::from_error(command, error),
    }
}

pub(crate) fn build_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread().enable_all().build()
}

/// Connects and brings the schema up to date.
pub(crate) async fn open_pool(config: &AppConfig) -> Result<DbPool, CommandError> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

/// Classifies a service error the same way any other front end would see it.
pub(crate) fn interface_failure(error: impl Into<ApplicationError>) -> CommandError {
    let error = error.into().into_interface("cli");
    let (error_class, exit_code) = match &error {
        InterfaceError::BadRequest { .. } => ("invalid_input", 8),
        InterfaceError::NotFound { .. } => ("not_found", 7),
        InterfaceError::ServiceUnavailable { .. } => ("query", 6),
        InterfaceError::Internal { .. } => ("internal", 9),
    };
    (error_class, error.to_string(), exit_code)
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
